//! XML compliance for extracted HTML markup.
//!
//! The artifact embeds HTML inside an XML document, so two HTML habits have
//! to be rewritten:
//!
//! 1. Void elements (`<br>`, `<img ...>`) must be self-closed.
//! 2. Valueless `data-*` attributes must carry an explicit `=""`.
//!
//! This is a textual rewrite over markup that already came out of the HTML
//! decomposition step. It is not an HTML parser and does not repair other
//! malformed input.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

pub const VOID_ELEMENTS: &[&str] = &[
    "input", "img", "br", "hr", "meta", "link", "area", "base", "col", "embed", "source", "track",
    "wbr",
];

lazy_static! {
    static ref VOID_TAG_REGEX: Regex = Regex::new(&format!(
        r"(?i)<({})((?:[\s/][^>]*)?)>",
        VOID_ELEMENTS.join("|")
    ))
    .unwrap();
    static ref OPEN_TAG_REGEX: Regex = Regex::new(r"<([\w-]+)([^>]*)>").unwrap();
}

/// Rewrite `markup` so it is legal inside an XML document.
/// Applying it to its own output changes nothing.
pub fn make_xml_compliant(markup: &str) -> String {
    let closed = self_close_void_elements(markup);
    fill_data_attribute_values(&closed)
}

fn self_close_void_elements(markup: &str) -> String {
    VOID_TAG_REGEX
        .replace_all(markup, |caps: &Captures| {
            let tag = &caps[1];
            let attrs = caps[2].trim_end();
            if attrs.ends_with('/') {
                caps[0].to_string()
            } else {
                format!("<{}{} />", tag, attrs)
            }
        })
        .into_owned()
}

fn fill_data_attribute_values(markup: &str) -> String {
    OPEN_TAG_REGEX
        .replace_all(markup, |caps: &Captures| {
            format!("<{}{}>", &caps[1], rewrite_attribute_list(&caps[2]))
        })
        .into_owned()
}

/// Walk an attribute list, giving every valueless `data-*` attribute `=""`.
/// Quoted values are skipped so their contents are never rewritten.
fn rewrite_attribute_list(attrs: &str) -> String {
    let bytes = attrs.as_bytes();
    let mut out = String::with_capacity(attrs.len() + 8);
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c.is_ascii_whitespace() || c == b'/' {
            out.push(c as char);
            i += 1;
            continue;
        }

        // Attribute name
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        let name = &attrs[name_start..i];
        out.push_str(name);

        // Look past whitespace for '='
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        if j < bytes.len() && bytes[j] == b'=' {
            out.push_str(&attrs[i..=j]);
            i = j + 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                out.push(bytes[i] as char);
                i += 1;
            }
            let value_start = i;
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
            } else {
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            out.push_str(&attrs[value_start..i]);
        } else if is_data_attribute(name) {
            out.push_str("=\"\"");
        }
    }

    out
}

fn is_data_attribute(name: &str) -> bool {
    name.len() > "data-".len()
        && name
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_self_closed() {
        for tag in VOID_ELEMENTS {
            let input = format!("<{} class=\"x\">", tag);
            let expected = format!("<{} class=\"x\" />", tag);
            assert_eq!(make_xml_compliant(&input), expected, "tag {}", tag);
        }
    }

    #[test]
    fn test_void_element_without_attributes() {
        assert_eq!(make_xml_compliant("a<br>b<hr>"), "a<br />b<hr />");
    }

    #[test]
    fn test_already_closed_not_double_closed() {
        let input = "<img src=\"a.png\" /><br/><input type=\"text\"/>";
        assert_eq!(make_xml_compliant(input), input);
    }

    #[test]
    fn test_self_closing_idempotent() {
        let input = "<div><img src=\"a.png\"><br><meta charset=\"utf-8\"></div>";
        let once = make_xml_compliant(input);
        assert_eq!(make_xml_compliant(&once), once);
        assert_eq!(
            once,
            "<div><img src=\"a.png\" /><br /><meta charset=\"utf-8\" /></div>"
        );
    }

    #[test]
    fn test_uppercase_void_elements() {
        assert_eq!(make_xml_compliant("<BR>"), "<BR />");
    }

    #[test]
    fn test_prefix_of_void_name_untouched() {
        let input = "<colgroup><col span=\"2\"></colgroup>";
        assert_eq!(
            make_xml_compliant(input),
            "<colgroup><col span=\"2\" /></colgroup>"
        );
    }

    #[test]
    fn test_custom_elements_named_after_void_tags_untouched() {
        let input = r#"<input-group class="g"><span>x</span></input-group><col-picker></col-picker><img-slider data-auto></img-slider>"#;
        let output = make_xml_compliant(input);
        assert_eq!(
            output,
            r#"<input-group class="g"><span>x</span></input-group><col-picker></col-picker><img-slider data-auto=""></img-slider>"#
        );
        let wrapped = format!("<div>{}</div>", output);
        assert!(roxmltree::Document::parse(&wrapped).is_ok());
    }

    #[test]
    fn test_void_element_with_slash_and_no_space() {
        assert_eq!(make_xml_compliant("<br/><hr\n>"), "<br/><hr />");
    }

    #[test]
    fn test_valueless_data_attributes_filled() {
        assert_eq!(
            make_xml_compliant("<div data-open class=\"a\" data-x-y>hi</div>"),
            "<div data-open=\"\" class=\"a\" data-x-y=\"\">hi</div>"
        );
    }

    #[test]
    fn test_data_attribute_on_void_element() {
        assert_eq!(
            make_xml_compliant("<input data-bound>"),
            "<input data-bound=\"\" />"
        );
    }

    #[test]
    fn test_valued_data_attributes_untouched() {
        let input = "<div data-id=\"7\" data-name='n' data-k=v data-sp = \"s\"></div>";
        assert_eq!(make_xml_compliant(input), input);
    }

    #[test]
    fn test_data_attributes_idempotent() {
        let once = make_xml_compliant("<p data-a data-b=\"1\" data-c>t</p>");
        assert_eq!(make_xml_compliant(&once), once);
    }

    #[test]
    fn test_quoted_values_not_rewritten() {
        let input = "<span title=\"see data-hint here\"></span>";
        assert_eq!(make_xml_compliant(input), input);
    }

    #[test]
    fn test_non_data_boolean_attributes_left_alone() {
        let input = "<button disabled>go</button>";
        assert_eq!(make_xml_compliant(input), input);
    }

    #[test]
    fn test_closing_tags_and_text_preserved() {
        let input = "<ul>\n  <li>one</li>\n</ul>";
        assert_eq!(make_xml_compliant(input), input);
    }
}
