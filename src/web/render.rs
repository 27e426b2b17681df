use std::borrow::Cow;
use std::fmt::Write;

use crate::SearchResult;

pub const PREVIEW_CHARS: usize = 150;

pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// First `max_chars` characters of `text`, with `...` appended if cut.
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

/// Link target for a root-relative url, each segment percent-encoded.
pub fn href(url: &str) -> String {
    let encoded: Vec<_> = url.split('/').map(urlencoding::encode).collect();
    format!("/{}", encoded.join("/"))
}

pub fn search_page(query: &str, results: &[SearchResult]) -> String {
    let mut items = String::new();
    for result in results {
        let _ = write!(
            items,
            r#"
        <li>
            <h3><a href="{href}">{title}</a></h3>
            <p>{preview}</p>
        </li>"#,
            href = escape(&href(&result.url)),
            title = escape(&result.title),
            preview = escape(&truncate(&result.content, PREVIEW_CHARS)),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Doc Search :: Search</title>
    <style>
        .row {{ padding: 1%; }}
    </style>
</head>
<body>
    <div class="row">
        <form action="/search" method="GET">
            <input type="search" id="search_textbox" name="q" value="{query}">
            <button type="submit">Search</button>
        </form>
    </div>
    <ul>{items}
    </ul>
</body>
</html>
"#,
        query = escape(query),
    )
}
