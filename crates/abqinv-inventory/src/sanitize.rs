//! Group-key sanitizing

/// Turn a display title into a token usable inside a group key
///
/// Brackets are dropped; spaces and slashes become underscores.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']'))
        .map(|c| if matches!(c, ' ' | '/') { '_' } else { c })
        .collect()
}
