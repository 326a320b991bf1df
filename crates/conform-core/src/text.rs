//! # Prose Helpers
//!
//! Small string utilities used when composing end-user messages.

/// Uppercase the first character of `value`, leaving the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join items into prose: `["a", "b", "c"]` becomes `"a, b and c"`.
pub fn nice_join<S: AsRef<str>>(items: &[S]) -> String {
    nice_join_with(items, " and ", ", ")
}

/// Join items into prose with explicit separators.
///
/// Zero items give an empty string and one item is returned as is. Two items
/// are joined by `last_separator`. Longer lists join every item but the last
/// with `separator`, then append `last_separator` and the final item.
pub fn nice_join_with<S: AsRef<str>>(items: &[S], last_separator: &str, separator: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let head = head
                .iter()
                .map(|item| item.as_ref())
                .collect::<Vec<&str>>()
                .join(separator);
            format!("{head}{last_separator}{}", last.as_ref())
        }
    }
}
