/// Filesystem-safe identifier for a chapter or exercise name: lowercase,
/// whitespace runs become single hyphens, anything outside `[a-z0-9-]` is
/// dropped.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == '-')
        .collect()
}
