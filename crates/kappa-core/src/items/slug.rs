/// Derive the asset file stem for an item name.
///
/// Lowercases, turns spaces and hyphens into underscores and drops
/// apostrophes, parentheses, `#` and commas. Every other character is kept.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            '\'' | '(' | ')' | '#' | ',' => None,
            other => Some(other),
        })
        .collect()
}
