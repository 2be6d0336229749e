/// Truncate a response body for log records and error messages.
/// Cuts on a character boundary and notes the original byte length.
pub fn truncate_body(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }
    let mut end = max_len;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_short_is_untouched() {
        assert_eq!(truncate_body("{\"code\":200}", 500), "{\"code\":200}");
    }

    #[test]
    fn test_truncate_body_long() {
        let body = "x".repeat(600);
        let out = truncate_body(&body, 500);
        assert!(out.starts_with(&"x".repeat(500)));
        assert!(out.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        // "é" is two bytes; cutting at 3 would split the second one
        let out = truncate_body("éééé", 3);
        assert!(out.starts_with("é..."));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Hello", 2), "He");
    }
}
