use std::fmt;

use crate::error::CatalogError;
use crate::parser::RawRecord;

/// A typed media entry. Fields are private so entries stay immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    title: String,
    year: i64,
    kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryKind {
    Movie { rating: f64 },
    Series { seasons: u32, episodes: u32 },
}

impl CatalogEntry {
    pub fn movie(title: &str, year: i64, rating: f64) -> Result<Self, CatalogError> {
        Self::new(title, year, EntryKind::Movie { rating })
    }

    pub fn series(
        title: &str,
        year: i64,
        seasons: u32,
        episodes: u32,
    ) -> Result<Self, CatalogError> {
        Self::new(title, year, EntryKind::Series { seasons, episodes })
    }

    fn new(title: &str, year: i64, kind: EntryKind) -> Result<Self, CatalogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        Ok(CatalogEntry {
            title: title.to_string(),
            year,
            kind,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_movie(&self) -> bool {
        matches!(self.kind, EntryKind::Movie { .. })
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.year)?;
        match self.kind {
            EntryKind::Movie { rating } => write!(f, " – Rating: {:.1}", rating),
            EntryKind::Series { seasons, episodes } => {
                write!(f, " – Seasons: {}, Episodes: {}", seasons, episodes)
            }
        }
    }
}

/// Scraped movies first (chart order), then the seed series in the order given.
pub fn build(
    raw: &[RawRecord],
    seeds: impl IntoIterator<Item = CatalogEntry>,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let mut catalog = raw
        .iter()
        .map(|r| CatalogEntry::movie(&r.title, r.year, r.rating))
        .collect::<Result<Vec<_>, _>>()?;
    catalog.extend(seeds);
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, year: i64, rating: f64) -> RawRecord {
        RawRecord {
            title: title.into(),
            year,
            rating,
        }
    }

    #[test]
    fn movies_then_series_in_order() {
        let records = vec![raw("Film A", 2001, 9.5), raw("Film B", 1999, 8.6)];
        let seeds = vec![
            CatalogEntry::series("Show C", 2010, 3, 24).unwrap(),
            CatalogEntry::series("Show D", 2012, 1, 8).unwrap(),
        ];
        let catalog = build(&records, seeds).unwrap();

        let titles: Vec<&str> = catalog.iter().map(|e| e.title()).collect();
        assert_eq!(titles, ["Film A", "Film B", "Show C", "Show D"]);
        assert!(catalog[0].is_movie());
        assert_eq!(catalog[1].kind(), EntryKind::Movie { rating: 8.6 });
        assert_eq!(
            catalog[2].kind(),
            EntryKind::Series {
                seasons: 3,
                episodes: 24
            }
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let records = vec![raw("Same", 2000, 8.0), raw("Same", 2000, 8.0)];
        assert_eq!(build(&records, []).unwrap().len(), 2);
    }

    #[test]
    fn empty_title_rejected() {
        assert_eq!(
            CatalogEntry::movie("  ", 2000, 7.0),
            Err(CatalogError::EmptyTitle)
        );
        let records = vec![raw("Ok", 2000, 7.0), raw("", 2000, 7.0)];
        assert!(build(&records, []).is_err());
    }

    #[test]
    fn describe_dispatches_on_kind() {
        let movie = CatalogEntry::movie("O Poderoso Chefão", 1972, 9.2).unwrap();
        let series = CatalogEntry::series("Breaking Bad", 2008, 5, 62).unwrap();
        assert_eq!(movie.to_string(), "O Poderoso Chefão (1972) – Rating: 9.2");
        assert_eq!(
            series.to_string(),
            "Breaking Bad (2008) – Seasons: 5, Episodes: 62"
        );
    }
}
