//! Locale-aware title ordering
//!
//! Titles compare on a folded key (NFD, combining marks dropped, lowercased) so
//! "Élite" sorts next to "elite"; the raw string breaks ties. Empty titles sort
//! first.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Accent- and case-insensitive comparison key
pub fn collation_key(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let (a_empty, b_empty) = (a.trim().is_empty(), b.trim().is_empty());
    match (a_empty, b_empty) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => collation_key(a)
            .cmp(&collation_key(b))
            .then_with(|| a.cmp(b)),
    }
}

/// Stable sort of `items` by the title returned from `title_of`
pub fn sort_by_title<T, F>(items: &mut [T], title_of: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| compare_titles(title_of(a), title_of(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_and_case_fold() {
        assert_eq!(collation_key("Élite"), "elite");
        assert_eq!(compare_titles("Ágape", "Batman"), Ordering::Less);
        assert_eq!(compare_titles("batman", "Cidade"), Ordering::Less);
    }

    #[test]
    fn test_empty_titles_first_and_raw_tiebreak() {
        let mut titles = vec!["Zodiac", "", "alien", "Alien"];
        sort_by_title(&mut titles, |t| t);
        assert_eq!(titles, vec!["", "Alien", "alien", "Zodiac"]);
    }
}
