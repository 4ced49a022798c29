//! jsonedit-util - shared JSON value utilities for jsonedit.

pub mod json_cmp;
pub mod json_equal;
pub mod strings;

pub use json_cmp::{str_cmp, value_cmp};
pub use json_equal::deep_equal;
pub use strings::{contains_ci, find_unique_name, value_to_display_string};
