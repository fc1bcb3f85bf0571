/// Text processing utilities shared by the normalizer, filter and deduplicator
pub mod text {
    /// Trim and collapse every run of whitespace into a single space
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Collapsed, non-empty text or `None`
    pub fn clean_optional(text: Option<&str>) -> Option<String> {
        text.map(collapse_whitespace).filter(|t| !t.is_empty())
    }

    /// Lowercase, turn punctuation into spaces and collapse whitespace.
    ///
    /// `"UI/UX  Design-Intern!"` becomes `"ui ux design intern"`.
    pub fn fold_for_comparison(text: &str) -> String {
        let folded: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .to_lowercase();
        collapse_whitespace(&folded)
    }

    /// Truncate to at most `max_chars` characters, breaking at a word boundary
    pub fn truncate_words(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let truncated: String = text.chars().take(max_chars).collect();
        match truncated.rfind(' ') {
            Some(last_space) if last_space > 0 => format!("{}...", &truncated[..last_space]),
            _ => format!("{}...", truncated),
        }
    }
}

/// HTML helpers for job descriptions
pub mod html {
    use super::text::collapse_whitespace;
    use scraper::{Html, Node};

    /// Elements whose boundaries separate words
    const BLOCK_TAGS: &[&str] = &[
        "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th", "table",
        "section", "article", "blockquote", "pre", "hr",
    ];

    const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

    /// Plain text of an HTML fragment: entities decoded, markup dropped
    pub fn to_plain_text(fragment: &str) -> String {
        let document = Html::parse_fragment(fragment);
        let mut text = String::with_capacity(fragment.len());

        for node in document.root_element().descendants() {
            match node.value() {
                Node::Text(piece) => {
                    let hidden = node
                        .parent()
                        .and_then(|parent| parent.value().as_element().map(|e| SKIPPED_TAGS.contains(&e.name())))
                        .unwrap_or(false);
                    if !hidden {
                        text.push_str(piece);
                    }
                }
                Node::Element(element) if BLOCK_TAGS.contains(&element.name()) => text.push(' '),
                _ => {}
            }
        }

        collapse_whitespace(&text)
    }

    /// Markup carried as escaped text, e.g. `&lt;p&gt;` becomes `<p>`
    pub fn unescape_markup(fragment: &str) -> String {
        Html::parse_fragment(fragment).root_element().text().collect()
    }
}
