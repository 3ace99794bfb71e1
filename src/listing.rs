//! HTML index pages for archive directories.

use std::fmt::Write;

/// Render an index page for a directory.
///
/// `url` becomes the title and `path` the heading. Every entry gets one link,
/// after a link to the parent directory. All interpolated text is escaped.
pub fn render(url: &str, path: &str, entries: &[String]) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n");
    let _ = writeln!(page, "<title>{}</title>", escape(url));
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    let _ = writeln!(page, "<h1>Index of {}</h1>", escape(path));
    page.push_str("<ul>\n");
    page.push_str("  <li><a href=\"../\">../</a></li>\n");
    for entry in entries {
        let entry = escape(entry);
        let _ = writeln!(page, "  <li><a href=\"{entry}\">./{entry}</a></li>");
    }
    page.push_str("</ul>\n");
    page
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_every_entry_and_the_parent() {
        let entries = vec!["a.txt".to_string(), "sub".to_string()];
        let page = render("hyper://abc/docs/", "docs/", &entries);

        assert!(page.contains("<title>hyper://abc/docs/</title>"));
        assert!(page.contains("<h1>Index of docs/</h1>"));
        assert!(page.contains("<a href=\"../\">../</a>"));
        assert!(page.contains("<a href=\"a.txt\">./a.txt</a>"));
        assert!(page.contains("<a href=\"sub\">./sub</a>"));
        assert_eq!(page.matches("<li>").count(), 3);
    }

    #[test]
    fn escapes_names_and_path() {
        let entries = vec!["<script>\".txt".to_string()];
        let page = render("hyper://abc/", "<b>&", &entries);

        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;&quot;.txt"));
        assert!(page.contains("Index of &lt;b&gt;&amp;"));
    }
}
