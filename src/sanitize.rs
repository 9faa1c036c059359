use lazy_static::lazy_static;
use regex::Regex;

/// Strips every markup tag from user-supplied text, keeping only the text
/// content. Empty allow-list: no tag or attribute survives. A stray `<` with
/// no closing `>` is not a tag and passes through unchanged.
pub fn strip_markup(input: &str) -> String {
    lazy_static! {
        static ref TAG_RE: Regex = Regex::new(r"(?s)</?[^>]*>").unwrap();
    }
    TAG_RE.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags_keeps_text() {
        assert_eq!(
            strip_markup("<script>alert(1)</script>hello"),
            "alert(1)hello"
        );
    }

    #[test]
    fn strips_tags_with_attributes() {
        assert_eq!(
            strip_markup(r#"<a href="https://evil.example" onclick="x()">link</a>"#),
            "link"
        );
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(strip_markup("just a plain post"), "just a plain post");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn unclosed_angle_bracket_passes_through() {
        assert_eq!(strip_markup("2 < 3 is true"), "2 < 3 is true");
    }

    #[test]
    fn strips_nested_and_multiline_markup() {
        assert_eq!(
            strip_markup("<div>\n<b>bold</b> and <i>italic</i>\n</div>"),
            "\nbold and italic\n"
        );
    }
}
