//! Label-driven field lookup in scraped HTML pages.
//!
//! `scraper::Html` is not `Send`, so callers parse and extract in one
//! synchronous step after the body has been downloaded.

use scraper::{ElementRef, Html};

/// Find the first text node equal to `label` and return the text of the next
/// `<td>` that follows it in document order.
pub(super) fn next_cell_after(doc: &Html, label: &str) -> Option<String> {
    let mut nodes = doc.tree.root().descendants();
    nodes.find(|n| n.value().as_text().is_some_and(|t| t.trim() == label))?;

    nodes
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
        .map(element_text)
}

/// Find a `<span>` whose text equals `label`, climb to its enclosing `<div>`
/// and return the text of the first `<p>` inside it.
pub(super) fn span_labelled_paragraph(doc: &Html, label: &str) -> Option<String> {
    let span = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "span" && element_text(*el) == label)?;

    let div = span
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")?;

    div.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p")
        .map(element_text)
}

/// Whitespace-normalized text content of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_HTML: &str = r#"
<html><body><table>
  <tr><td>Owner Name</td><td> Ravi Kumar </td></tr>
  <tr><th>IMEI number</th><td>35-209900-176148-1</td></tr>
  <tr><td>Complaints</td></tr>
</table></body></html>"#;

    const CARD_HTML: &str = r#"
<html><body>
  <div class="card"><span>Owner Name</span><p> A**** K**** </p></div>
  <div class="card"><div><span>Model Name</span></div><p>HONDA CITY</p></div>
  <div class="card"><span>Tax Upto</span></div>
</body></html>"#;

    #[test]
    fn next_cell_reads_following_td() {
        let doc = Html::parse_document(TABLE_HTML);
        assert_eq!(next_cell_after(&doc, "Owner Name").as_deref(), Some("Ravi Kumar"));
        assert_eq!(
            next_cell_after(&doc, "IMEI number").as_deref(),
            Some("35-209900-176148-1")
        );
    }

    #[test]
    fn next_cell_missing_label_or_cell() {
        let doc = Html::parse_document(TABLE_HTML);
        assert_eq!(next_cell_after(&doc, "Tower Locations"), None);
        assert_eq!(next_cell_after(&doc, "Complaints"), None);
    }

    #[test]
    fn span_label_reads_paragraph_in_parent_div() {
        let doc = Html::parse_document(CARD_HTML);
        assert_eq!(
            span_labelled_paragraph(&doc, "Owner Name").as_deref(),
            Some("A**** K****")
        );
        assert_eq!(span_labelled_paragraph(&doc, "Tax Upto"), None);
        assert_eq!(span_labelled_paragraph(&doc, "Address"), None);
    }

    #[test]
    fn span_label_uses_nearest_div() {
        let doc = Html::parse_document(CARD_HTML);
        // The nearest div around "Model Name" has no <p>; the outer one is not consulted.
        assert_eq!(span_labelled_paragraph(&doc, "Model Name"), None);
    }
}
