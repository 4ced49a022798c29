use serde_json::Value;

/// Case-insensitive substring check.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Render a JSON value the way an editor cell displays it: strings bare,
/// primitives in their literal form, containers as compact JSON text.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use jsonedit_util::value_to_display_string;
///
/// assert_eq!(value_to_display_string(&json!("hi")), "hi");
/// assert_eq!(value_to_display_string(&json!(null)), "null");
/// assert_eq!(value_to_display_string(&json!([1, 2])), "[1,2]");
/// ```
pub fn value_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Container serialization of an in-memory value cannot fail
        other => serde_json::to_string(other).expect("value serialization is infallible"),
    }
}

/// Pick a property name not present in `existing`, suffixing ` (copy)`,
/// ` (copy 2)`, ... until the name is free.
///
/// # Examples
///
/// ```
/// use jsonedit_util::find_unique_name;
///
/// let existing = ["a".to_string(), "b".to_string()];
/// assert_eq!(find_unique_name("c", existing.iter().map(|s| s.as_str())), "c");
/// assert_eq!(find_unique_name("a", existing.iter().map(|s| s.as_str())), "a (copy)");
/// ```
pub fn find_unique_name<'a>(name: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.collect();
    if !taken.contains(&name) {
        return name.to_string();
    }
    let mut copy = 1usize;
    loop {
        let candidate = if copy == 1 {
            format!("{name} (copy)")
        } else {
            format!("{name} (copy {copy})")
        };
        if !taken.iter().any(|t| *t == candidate) {
            return candidate;
        }
        copy += 1;
    }
}
