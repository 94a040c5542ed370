//! Listing-page extraction.
//!
//! Archive listing pages are plain HTML tables: one anchor per entry, with a
//! `td.size` cell in the same row for file leaves. Everything else on the
//! page is ignored.

use scraper::{ElementRef, Html, Selector};

/// One anchor pulled off a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// The raw href, undecoded and unresolved.
    pub href: String,
    /// The size cell text of the enclosing row; empty when absent or "-".
    pub size: String,
}

/// Extract every `<a href>` and its row's size cell from a listing page.
pub fn parse_listing(html: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a").unwrap();
    let size_cell = Selector::parse("td.size").unwrap();

    let mut entries = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let size = enclosing_row(anchor)
            .and_then(|row| row.select(&size_cell).next())
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let size = if size == "-" { String::new() } else { size };

        entries.push(ListingEntry {
            href: href.to_string(),
            size,
        });
    }
    entries
}

fn enclosing_row(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut node = element.parent();
    while let Some(current) = node {
        if let Some(el) = ElementRef::wrap(current) {
            if el.value().name() == "tr" {
                return Some(el);
            }
        }
        node = current.parent();
    }
    None
}
