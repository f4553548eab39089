/// Sanitizes user-written discussion markup.
///
/// Whitelist based: harmless formatting (`<b>`, `<p>`, links) survives,
/// `<script>` is dropped together with its content, and event-handler
/// attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_and_handlers_removed() {
        assert_eq!(clean_html("<p onclick=\"x()\">hi</p>"), "<p>hi</p>");
        assert_eq!(clean_html("ok<script>alert(1)</script>"), "ok");
    }

    #[test]
    fn test_arabic_text_untouched() {
        assert_eq!(clean_html("ما هو العقد؟"), "ما هو العقد؟");
    }
}
