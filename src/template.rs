//! # Artifact Template
//!
//! Assembles the final SVG document: a graphics root holding one
//! `foreignObject`, which holds one XHTML document.
//!
//! ## Body Order
//!
//! The body is always emitted in this order:
//!
//! 1. error overlay (hidden)
//! 2. application body markup, or an empty `#root` mount
//! 3. embedded data snapshot (`#dataStore`)
//! 4. runtime script
//! 5. global error / rejection handlers
//! 6. application script block(s)
//!
//! The runtime must exist before application code runs, and the handlers must
//! be attached before any code that could throw.
//!
//! ## XML Safety
//!
//! Every script and style body sits in a CDATA section. Literal `</script`
//! sequences in application code are escaped as `<\/script`, and `]]>` inside
//! embedded text is split across two CDATA sections.

use lazy_static::lazy_static;
use regex::Regex;

use crate::normalize::make_xml_compliant;
use crate::runtime::RUNTIME_GLOBAL;

/// Splits compiled application text into independent script blocks.
pub const SCRIPT_SEPARATOR: &str = "<!--SCRIPT_SEPARATOR-->";

/// Mount point for component-tree and template-compiled apps.
pub const ROOT_MOUNT: &str = r#"<div id="root"></div>"#;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

lazy_static! {
    static ref SCRIPT_CLOSE_REGEX: Regex = Regex::new(r"(?i)</(script)").unwrap();
    static ref ROOT_OPEN_REGEX: Regex =
        Regex::new(r#"(?is)<div\b[^>]*\bid\s*=\s*["']root["'][^>]*>"#).unwrap();
    static ref DIV_TAG_REGEX: Regex = Regex::new(r"(?i)<(/?)div\b[^>]*>").unwrap();
    static ref BODY_SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)<script\b[^>]*/>|<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref BODY_STYLE_REGEX: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
}

const BASE_CSS: &str = r#"
* {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', 'Oxygen',
    'Ubuntu', 'Cantarell', 'Fira Sans', 'Droid Sans', 'Helvetica Neue',
    sans-serif;
  box-sizing: border-box;
}
body, html {
  margin: 0;
  padding: 0;
  width: 100%;
  height: 100%;
  overflow: hidden;
  background-color: transparent;
}
#root {
  width: 100%;
  height: 100%;
  display: flex;
  flex-direction: column;
}
"#;

const ERROR_OVERLAY_HTML: &str = r#"<div id="error-overlay" style="display: none; position: fixed; top: 0; left: 0; width: 100%; height: 100%; background: rgba(50,0,0,0.9); color: white; padding: 20px; z-index: 9999; overflow: auto; font-family: monospace;">
  <h2 style="color: #ff5555; margin-top: 0;">Runtime Error</h2>
  <pre id="error-message" style="white-space: pre-wrap; font-size: 14px; background: rgba(0,0,0,0.5); padding: 10px; border-radius: 4px;"></pre>
  <button onclick="document.getElementById('error-overlay').style.display='none'" style="margin-top: 20px; padding: 8px 16px; cursor: pointer; background: #fff; border: none; border-radius: 4px; font-weight: bold;">Close</button>
</div>"#;

const ERROR_HANDLER_JS: &str = r#"
(function () {
  function show(text) {
    var overlay = document.getElementById('error-overlay');
    var msg = document.getElementById('error-message');
    if (overlay && msg) {
      msg.textContent = text;
      overlay.style.display = 'block';
    }
  }
  window.addEventListener('error', function (event) {
    show(event.error ? (event.error.stack || event.error.message) : event.message);
    console.error('SVGApp Error:', event.error || event.message);
  });
  window.addEventListener('unhandledrejection', function (event) {
    show('Unhandled Promise Rejection: ' + (event.reason ? (event.reason.stack || event.reason) : 'Unknown reason'));
    console.error('SVGApp Unhandled Rejection:', event.reason);
  });
})();
"#;

#[derive(Debug, Clone)]
pub struct TemplateInput<'a> {
    /// Compiled application script text.
    pub js: &'a str,
    /// Compiled application stylesheet text.
    pub css: &'a str,
    /// Body markup from an HTML entry, before cleanup.
    pub body: Option<&'a str>,
    /// Compiled runtime script text.
    pub runtime: &'a str,
    /// JSON snapshot baked into `#dataStore`.
    pub seed_data: &'a serde_json::Value,
    /// Run each application block only once the DOM is ready, after
    /// initializing the runtime. Used for no-framework HTML entries.
    pub defer_until_ready: bool,
}

/// Produce the complete artifact document.
pub fn compose(input: &TemplateInput) -> String {
    let body = input
        .body
        .and_then(prepare_body)
        .unwrap_or_else(|| ROOT_MOUNT.to_string());

    let escaped = escape_script_close(input.js);
    let scripts = split_script_blocks(&escaped)
        .into_iter()
        .map(|block| {
            let code = if input.defer_until_ready {
                wrap_until_ready(block)
            } else {
                block.to_string()
            };
            script_element(&code)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let seed = serde_json::to_string(input.seed_data).unwrap_or_else(|_| "{}".to_string());
    let styles = format!("{}{}", BASE_CSS, input.css);

    format!(
        r#"<svg xmlns="{svg_ns}" xmlns:xlink="{xlink_ns}" width="100%" height="100%" id="svgApp">
  <foreignObject width="100%" height="100%">
    <html xmlns="{xhtml_ns}">
      <head>
        <style>{styles}</style>
      </head>
      <body>
{overlay}
{body}
<script type="application/json" id="dataStore">{seed}</script>
{runtime}
{handlers}
{scripts}
      </body>
    </html>
  </foreignObject>
</svg>
"#,
        svg_ns = SVG_NS,
        xlink_ns = XLINK_NS,
        xhtml_ns = XHTML_NS,
        styles = cdata(&styles),
        overlay = ERROR_OVERLAY_HTML,
        body = body,
        seed = cdata(&seed),
        runtime = script_element(input.runtime),
        handlers = script_element(ERROR_HANDLER_JS),
        scripts = scripts,
    )
}

/// Clean HTML body markup for embedding. Returns `None` when nothing
/// remains, in which case the caller falls back to the root mount.
///
/// The `#root` wrapper is unwrapped and `<script>`/`<style>` elements are
/// dropped because their contents are inlined elsewhere in the artifact.
pub fn prepare_body(markup: &str) -> Option<String> {
    if markup.trim().is_empty() {
        return None;
    }

    let unwrapped = strip_root_wrapper(markup.trim());
    let without_scripts = BODY_SCRIPT_REGEX.replace_all(&unwrapped, "");
    let without_styles = BODY_STYLE_REGEX.replace_all(&without_scripts, "");
    let compliant = make_xml_compliant(without_styles.trim());

    if compliant.trim().is_empty() {
        None
    } else {
        Some(compliant)
    }
}

/// Replace the first `<div id="root">…</div>` with its children.
/// Nested divs are balanced; an unclosed wrapper is left as-is.
fn strip_root_wrapper(markup: &str) -> String {
    let Some(open) = ROOT_OPEN_REGEX.find(markup) else {
        return markup.to_string();
    };

    let rest = &markup[open.end()..];
    let mut depth = 1usize;
    for tag in DIV_TAG_REGEX.captures_iter(rest) {
        let Some(whole) = tag.get(0) else { continue };
        if tag.get(1).is_some_and(|m| m.as_str() == "/") {
            depth -= 1;
            if depth == 0 {
                return format!(
                    "{}{}{}",
                    &markup[..open.start()],
                    &rest[..whole.start()],
                    &rest[whole.end()..]
                );
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }

    markup.to_string()
}

/// Escape every closing-script sequence so it cannot end a script element.
pub fn escape_script_close(js: &str) -> String {
    SCRIPT_CLOSE_REGEX.replace_all(js, r"<\/$1").into_owned()
}

/// Split on [`SCRIPT_SEPARATOR`], dropping blank blocks and keeping order.
pub fn split_script_blocks(js: &str) -> Vec<&str> {
    js.split(SCRIPT_SEPARATOR)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

fn wrap_until_ready(code: &str) -> String {
    format!(
        r#"(function () {{
  if (typeof {global} !== 'undefined') {{
    {global}.init();
  }}
  var run = function () {{
{code}
  }};
  if (document.readyState === 'loading') {{
    document.addEventListener('DOMContentLoaded', run);
  }} else {{
    run();
  }}
}})();"#,
        global = RUNTIME_GLOBAL,
        code = code
    )
}

fn script_element(code: &str) -> String {
    format!("<script>{}</script>", cdata(code.trim()))
}

/// Wrap `text` in a CDATA section, splitting any `]]>` it contains.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[\n{}\n]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input<'a>(js: &'a str, body: Option<&'a str>, seed: &'a serde_json::Value) -> TemplateInput<'a> {
        TemplateInput {
            js,
            css: "",
            body,
            runtime: "window.SVGApp = {};",
            seed_data: seed,
            defer_until_ready: false,
        }
    }

    fn parse(doc: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(doc).expect("artifact must be well-formed XML")
    }

    #[test]
    fn test_script_close_escaped() {
        let seed = json!({});
        let doc = compose(&input("var s = '</script>'; var t = '</SCRIPT >';", None, &seed));
        let app_part = &doc[doc.find("var s").unwrap()..];
        assert!(!app_part.contains("</script>'"));
        assert!(app_part.contains(r"<\/script>"));
        assert!(app_part.contains(r"<\/SCRIPT >"));
        parse(&doc);
    }

    #[test]
    fn test_escape_is_applied_once() {
        let once = escape_script_close("a</script>b");
        assert_eq!(once, r"a<\/script>b");
        assert_eq!(escape_script_close(&once), once);
    }

    #[test]
    fn test_empty_body_uses_root_mount() {
        let seed = json!({});
        for body in [None, Some(""), Some("   \n\t ")] {
            let doc = compose(&input("x()", body, &seed));
            assert_eq!(doc.matches(ROOT_MOUNT).count(), 1);
        }
    }

    #[test]
    fn test_body_markup_becomes_document_body() {
        let seed = json!({});
        let doc = compose(&input("x()", Some("<main><h1>Hello</h1><br></main>"), &seed));
        assert!(doc.contains("<main><h1>Hello</h1><br /></main>"));
        assert!(!doc.contains(ROOT_MOUNT));
        parse(&doc);
    }

    #[test]
    fn test_body_order_is_fixed() {
        let seed = json!({"a": 1});
        let doc = compose(&input("appCode()", Some("<p>markup</p>"), &seed));
        let overlay = doc.find("error-overlay").unwrap();
        let markup = doc.find("<p>markup</p>").unwrap();
        let data = doc.find("id=\"dataStore\"").unwrap();
        let runtime = doc.find("window.SVGApp = {};").unwrap();
        let handlers = doc.find("unhandledrejection").unwrap();
        let app = doc.find("appCode()").unwrap();
        assert!(overlay < markup);
        assert!(markup < data);
        assert!(data < runtime);
        assert!(runtime < handlers);
        assert!(handlers < app);
    }

    #[test]
    fn test_document_structure() {
        let seed = json!({});
        let doc_text = compose(&input("x()", None, &seed));
        let doc = parse(&doc_text);
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "svg");
        assert_eq!(root.tag_name().namespace(), Some(SVG_NS));
        assert_eq!(root.attribute("id"), Some("svgApp"));

        let foreign: Vec<_> = root
            .children()
            .filter(|n| n.is_element())
            .collect();
        assert_eq!(foreign.len(), 1);
        assert_eq!(foreign[0].tag_name().name(), "foreignObject");

        let html = foreign[0].children().find(|n| n.is_element()).unwrap();
        assert_eq!(html.tag_name().name(), "html");
        assert_eq!(html.tag_name().namespace(), Some(XHTML_NS));
    }

    #[test]
    fn test_xml_significant_characters_preserved_in_code() {
        let seed = json!({});
        let js = "if (a < b && c > d) { s = '<b>&amp;</b>'; }";
        let doc_text = compose(&input(js, None, &seed));
        let doc = parse(&doc_text);
        let found = doc
            .descendants()
            .filter(|n| n.has_tag_name((XHTML_NS, "script")))
            .any(|n| n.text().is_some_and(|t| t.contains(js)));
        assert!(found);
    }

    #[test]
    fn test_cdata_terminator_split() {
        let seed = json!({});
        let js = "var nested = a[b[c]]>0;";
        let doc_text = compose(&input(js, None, &seed));
        let doc = parse(&doc_text);
        let text: String = doc
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        assert!(text.contains(js));
    }

    #[test]
    fn test_separator_splits_into_ordered_blocks() {
        let seed = json!({});
        let js = format!("first()\n{}\n  \n{}second()", SCRIPT_SEPARATOR, SCRIPT_SEPARATOR);
        let doc = compose(&input(&js, None, &seed));
        let first = doc.find("first()").unwrap();
        let second = doc.find("second()").unwrap();
        assert!(first < second);
        assert!(!doc.contains(SCRIPT_SEPARATOR));
        assert_eq!(split_script_blocks(&js), vec!["first()", "second()"]);
        // runtime + handlers + two application blocks
        assert_eq!(doc.matches("<script>").count(), 4);
    }

    #[test]
    fn test_defer_wraps_each_block() {
        let seed = json!({});
        let js = format!("a()\n{}\nb()", SCRIPT_SEPARATOR);
        let mut tpl = input(&js, None, &seed);
        tpl.defer_until_ready = true;
        let doc = compose(&tpl);
        assert_eq!(doc.matches("document.readyState === 'loading'").count(), 2);
        assert_eq!(doc.matches("SVGApp.init();").count(), 2);
        parse(&doc);
    }

    #[test]
    fn test_seed_data_embedded() {
        let seed = json!({"todos": ["<b>&</b>"], "n": 2});
        let doc_text = compose(&input("x()", None, &seed));
        let doc = parse(&doc_text);
        let store = doc
            .descendants()
            .find(|n| n.attribute("id") == Some("dataStore"))
            .unwrap();
        let text: String = store.children().filter_map(|n| n.text()).collect();
        let parsed: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, seed);
    }

    #[test]
    fn test_prepare_body_unwraps_root_and_strips_scripts() {
        let body = r#"<div id="root"><div class="card"><input type="text"></div><p>after</p></div>
            <script src="app.js"></script><script>console.log(1)</script>"#;
        assert_eq!(
            prepare_body(body).unwrap(),
            r#"<div class="card"><input type="text" /></div><p>after</p>"#
        );
    }

    #[test]
    fn test_prepare_body_only_root_is_empty() {
        assert_eq!(prepare_body(r#"<div id="root"></div>"#), None);
        assert_eq!(
            prepare_body("<div id='root'></div>\n<script>console.log(1)</script>"),
            None
        );
    }

    #[test]
    fn test_prepare_body_keeps_siblings_of_root() {
        let body = r#"<header>h</header><div class="x" id="root">in</div><footer>f</footer>"#;
        assert_eq!(prepare_body(body).unwrap(), "<header>h</header>in<footer>f</footer>");
    }

    #[test]
    fn test_unclosed_root_left_alone() {
        assert_eq!(
            strip_root_wrapper(r#"<div id="root"><p>x</p>"#),
            r#"<div id="root"><p>x</p>"#
        );
    }

    #[test]
    fn test_styles_include_base_and_app_css() {
        let seed = json!({});
        let mut tpl = input("x()", None, &seed);
        tpl.css = ".app > .item { color: red }";
        let doc = compose(&tpl);
        assert!(doc.contains("flex-direction: column"));
        assert!(doc.contains(".app > .item { color: red }"));
        parse(&doc);
    }
}
