/// Last segment of a slash separated id.
pub fn short_name(id: &str) -> &str {
    id.rsplit_once('/').map(|(_, rest)| rest).unwrap_or(id)
}
