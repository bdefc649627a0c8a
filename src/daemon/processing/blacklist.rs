/// Decides whether a window may be recorded. A window is rejected when any keyword occurs in
/// its app name or title, ignoring case. Blank keywords never match.
pub fn is_allowed<K: AsRef<str>>(
    app: &str,
    title: &str,
    keywords: impl IntoIterator<Item = K>,
) -> bool {
    let app = app.to_lowercase();
    let title = title.to_lowercase();
    !keywords.into_iter().any(|keyword| {
        let keyword = keyword.as_ref().trim().to_lowercase();
        !keyword.is_empty() && (app.contains(&keyword) || title.contains(&keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::is_allowed;

    #[test]
    fn test_rejects_keyword_in_app_or_title() {
        let keywords = ["keepass", "Incognito"];

        assert!(!is_allowed("KeePassXC", "Database", keywords));
        assert!(!is_allowed("firefox", "New INCOGNITO tab", keywords));
        assert!(is_allowed("firefox", "Rust docs", keywords));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(is_allowed("code", "", Vec::<String>::new()));
        assert!(is_allowed("code", "", ["", "  "]));
        assert!(!is_allowed("code", "", ["CODE"]));
    }

    #[test]
    fn test_is_stable_across_calls() {
        let keywords = vec!["bank".to_string()];
        let first = is_allowed("firefox", "My Bank - Login", &keywords);
        let second = is_allowed("firefox", "My Bank - Login", &keywords);

        assert_eq!(first, second);
        assert!(!first);
    }
}
