// src/utils/html.rs

/// Sanitizes user-authored post and comment text.
///
/// Safe formatting tags (`<b>`, `<p>`, links) survive; scripts, iframes and
/// event-handler attributes are stripped. `<script>` elements lose their
/// content as well.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::clean_html;

    #[test]
    fn strips_scripts_keeps_formatting() {
        let cleaned = clean_html("<p>Use a <b>4mm</b> hook</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Use a <b>4mm</b> hook</p>");
    }

    #[test]
    fn drops_event_handlers() {
        let cleaned = clean_html(r#"<a href="https://yarn.example" onclick="steal()">yarn</a>"#);
        assert!(!cleaned.contains("onclick"));
        assert!(cleaned.contains("yarn.example"));
    }
}
