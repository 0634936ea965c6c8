/// Normalize a single tag: trimmed and lowercased.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Normalize a tag set before it is persisted: every tag is trimmed and
/// lowercased, empty tags are dropped and duplicates collapse onto their first
/// occurrence.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Split a form value such as `"rust, web"` into raw tags.
pub fn split_tag_field(value: &str) -> impl Iterator<Item = &str> {
    value.split(',')
}
