use once_cell::sync::Lazy;
use regex::Regex;
use select::node::Node;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Collapse runs of whitespace and trim.
pub fn clean_text(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// Text of a node and its descendants, one non-empty text run per line.
pub fn text_lines(node: &Node) -> Vec<String> {
    node.descendants()
        .filter(|n| !n.parent().and_then(|p| p.name()).is_some_and(|name| name == "script" || name == "style"))
        .filter_map(|n| n.as_text().map(clean_text))
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn node_text(node: &Node) -> String {
    clean_text(&node.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use select::document::Document;
    use select::predicate::Name;

    #[test]
    fn lines_skip_blank_runs_and_scripts() {
        let doc = Document::from(
            "<section><h2>Benefits</h2>\n  <ul><li>Remote   first</li><li>Equity</li></ul><script>var x = 1;</script></section>",
        );
        let section = doc.find(Name("section")).next().unwrap();
        assert_eq!(text_lines(&section), vec!["Benefits", "Remote first", "Equity"]);
    }
}
