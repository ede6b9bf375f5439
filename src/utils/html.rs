use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) are preserved,
/// dangerous tags (<script>, <iframe>) and attributes (onclick) are stripped.
/// Applied to community post and comment bodies before storage.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("hello <script>alert(1)</script>world");
        assert!(!cleaned.contains("script"));
        assert!(cleaned.contains("hello"));
    }
}
