//! Stream id arithmetic for "read after" queries.

/// Returns a range start that excludes `id` itself.
///
/// Only the last character is bumped: `1-9` becomes `1-10`, `1-3` becomes
/// `1-4`. This is an approximation of the next id, and a reader may see one
/// duplicate event when it is off. Ids without a trailing digit are returned
/// unchanged.
#[must_use]
pub fn increment_id(id: &str) -> String {
    let Some(last) = id.chars().last() else {
        return id.to_string();
    };
    match last.to_digit(10) {
        Some(digit) => {
            let head = &id[..id.len() - last.len_utf8()];
            format!("{}{}", head, digit + 1)
        }
        None => id.to_string(),
    }
}
