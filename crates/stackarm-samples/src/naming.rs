use uuid::Uuid;

/// `prefix` followed by random lowercase hex, at most `max_len` characters.
///
/// A prefix that already fills `max_len` is truncated and gets no suffix.
pub fn random_resource_name(prefix: &str, max_len: usize) -> String {
    let mut name: String = prefix.chars().take(max_len).collect();
    let room = max_len - name.chars().count();
    // Two v4 uuids give 64 hex digits, more than any ARM name allows.
    let hex = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    name.extend(hex.chars().take(room));
    name.to_ascii_lowercase()
}

/// A throwaway secret value with upper, lower, digit and symbol characters.
pub fn random_password() -> String {
    format!("Pa5s!{}", Uuid::new_v4().simple())
}
