pub mod fields;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::FragmentError;

// Tied to the chart page's current markup.
static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.ipc-metadata-list-summary-item").unwrap());
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.ipc-title__text").unwrap());
static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.cli-title-metadata-item").unwrap());
static RATING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ipc-rating-star").unwrap());

/// One chart item as scraped. `year == 0` and `rating == 0.0` mean unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub title: String,
    pub year: i64,
    pub rating: f64,
}

/// Parse up to `limit` chart items. Malformed items are logged and skipped.
pub fn parse_chart(html: &str, limit: usize) -> Vec<RawRecord> {
    let doc = Html::parse_document(html);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, item) in doc.select(&ITEM_SEL).take(limit).enumerate() {
        match parse_item(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                debug!("Skipping chart item {}: {}", index + 1, e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed chart items", skipped);
    }
    records
}

fn parse_item(item: ElementRef) -> Result<RawRecord, FragmentError> {
    let title_text = item
        .select(&TITLE_SEL)
        .next()
        .map(element_text)
        .ok_or(FragmentError::MissingTitle)?;
    let title = fields::clean_title(&title_text)?;

    let year_token = item.select(&META_SEL).next().map(element_text);
    let year = fields::parse_year(year_token.as_deref());

    let rating = match item.select(&RATING_SEL).next() {
        Some(el) => fields::parse_rating(&element_text(el))?,
        None => 0.0,
    };

    Ok(RawRecord {
        title,
        year,
        rating,
    })
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/chart.html").unwrap()
    }

    #[test]
    fn parses_fixture_and_skips_bad_items() {
        let records = parse_chart(&fixture(), 250);
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Um Sonho de Liberdade",
                "O Poderoso Chefão",
                "Batman: O Cavaleiro das Trevas",
                "O Poderoso Chefão: Parte II",
                "O Senhor dos Anéis: O Retorno do Rei",
            ]
        );
        assert_eq!(
            records[0],
            RawRecord {
                title: "Um Sonho de Liberdade".into(),
                year: 1994,
                rating: 9.3
            }
        );
    }

    #[test]
    fn missing_rating_element_is_zero() {
        let records = parse_chart(&fixture(), 250);
        let batman = &records[2];
        assert_eq!(batman.year, 2008);
        assert_eq!(batman.rating, 0.0);
    }

    #[test]
    fn non_numeric_year_is_zero() {
        let records = parse_chart(&fixture(), 250);
        assert_eq!(records[3].year, 0);
        assert_eq!(records[3].rating, 9.0);
    }

    #[test]
    fn limit_caps_items_before_skipping() {
        let records = parse_chart(&fixture(), 2);
        assert_eq!(records.len(), 2);
        // items 5 and 6 are dropped, so 6 items yield 4 records
        assert_eq!(parse_chart(&fixture(), 6).len(), 4);
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(parse_chart("<html><body><p>blocked</p></body></html>", 250).is_empty());
        assert!(parse_chart("", 250).is_empty());
    }
}
