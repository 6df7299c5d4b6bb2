//! HTML escaping for free text that is stored and later rendered by the site.
//!
//! Everything an admin or visitor types (order notes, portfolio titles, review
//! text) is escaped before it reaches the document store. Renderers can then
//! insert stored values into markup as-is.
//!
//! The admin panel reads escaped values back and saves them unchanged, so
//! escaping must be idempotent: an entity this module produces is never
//! escaped a second time.

/// Entities produced by [`escape_html`]. Also accepted verbatim on input.
const ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;", "&#39;"];

/// Escape the five HTML-significant characters.
///
/// Idempotent: `escape_html(&escape_html(s)) == escape_html(s)`.
///
/// ```
/// use gfx_studio_core::escape_html;
///
/// assert_eq!(
///     escape_html("<script>alert(1)</script>"),
///     "&lt;script&gt;alert(1)&lt;/script&gt;"
/// );
/// ```
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' if input.get(i..).is_some_and(starts_with_entity) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn starts_with_entity(rest: &str) -> bool {
    ENTITIES.iter().any(|entity| rest.starts_with(entity))
}

/// Escape an optional field, leaving `None` untouched.
#[must_use]
pub fn escape_optional(input: Option<&str>) -> Option<String> {
    input.map(escape_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_script_tag() {
        assert_eq!(
            escape_html("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_escape_quotes_and_ampersand() {
        assert_eq!(
            escape_html(r#"a & "b" 'c'"#),
            "a &amp; &quot;b&quot; &#x27;c&#x27;"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_html("amazing work, 10/10"), "amazing work, 10/10");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(escape_html("très bien 🎨"), "très bien 🎨");
    }

    #[test]
    fn test_escape_is_idempotent() {
        for raw in [
            "Tom & Jerry",
            "<script>alert(1)</script>",
            r#"a & "b" 'c'"#,
            "https://cdn.test/a.png?x=1&y=2",
        ] {
            let once = escape_html(raw);
            assert_eq!(escape_html(&once), once);
            assert_eq!(escape_html(&escape_html(&once)), once);
        }
    }

    #[test]
    fn test_existing_entities_kept() {
        assert_eq!(escape_html("Tom &amp; Jerry"), "Tom &amp; Jerry");
        assert_eq!(escape_html("it&#39;s"), "it&#39;s");
        assert_eq!(escape_html("&lt;b&gt;"), "&lt;b&gt;");
    }

    #[test]
    fn test_bare_ampersands_escaped() {
        assert_eq!(escape_html("&copy; & &amp"), "&amp;copy; &amp; &amp;amp");
        assert_eq!(escape_html("&"), "&amp;");
    }

    #[test]
    fn test_escape_optional() {
        assert_eq!(escape_optional(None), None);
        assert_eq!(escape_optional(Some("<b>")), Some("&lt;b&gt;".to_string()));
    }
}
