//! Reference markup for processed groups.

use crate::core::Namespace;

/// One tag per URL, newline-separated.
///
/// ```text
/// css, sprite → <link rel="stylesheet" type="text/css" href="…" />
/// js          → <script type="text/javascript" src="…"></script>
/// ```
pub fn render_markup(namespace: Namespace, urls: &[String]) -> String {
    urls.iter()
        .map(|url| render_tag(namespace, url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_tag(namespace: Namespace, url: &str) -> String {
    let url = escape_attr(url);
    match namespace {
        Namespace::Css | Namespace::Sprite => {
            format!(r#"<link rel="stylesheet" type="text/css" href="{url}" />"#)
        }
        Namespace::Js => format!(r#"<script type="text/javascript" src="{url}"></script>"#),
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `url?v=<version>`.
pub fn versioned_url(url: &str, version: &str) -> String {
    format!("{url}?v={version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_per_namespace() {
        let urls = vec!["/a.css?v=1".to_string(), "/b.css".to_string()];
        assert_eq!(
            render_markup(Namespace::Css, &urls),
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"/a.css?v=1\" />\n\
             <link rel=\"stylesheet\" type=\"text/css\" href=\"/b.css\" />"
        );
        assert_eq!(
            render_markup(Namespace::Js, &["/app.js".to_string()]),
            "<script type=\"text/javascript\" src=\"/app.js\"></script>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let markup = render_markup(Namespace::Js, &["/a.js?x=1&y=\"2\"".to_string()]);
        assert!(markup.contains("src=\"/a.js?x=1&amp;y=&quot;2&quot;\""));
    }
}
