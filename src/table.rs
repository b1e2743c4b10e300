use std::fmt;

use crate::record::{RecordRow, compare_values};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Last applied sort. Only used to show the sort marker, the rows are
/// already stored in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub sorted_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

impl SortState {
    pub fn is_sorted_by(&self, field: &str) -> Option<SortDirection> {
        match &self.sorted_by {
            Some(f) if f == field => self.sort_direction,
            _ => None,
        }
    }
}

/// Returns a new snapshot of `rows` ordered by `field`.
///
/// The sort is stable in both directions: rows with equal values keep their
/// relative order. Descending swaps the operands instead of reversing the
/// result so ties are not flipped.
pub fn sort_rows(rows: &[RecordRow], field: &str, direction: SortDirection) -> Vec<RecordRow> {
    let mut sorted = rows.to_vec();
    match direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare_values(a.get(field), b.get(field))),
        SortDirection::Desc => sorted.sort_by(|a, b| compare_values(b.get(field), a.get(field))),
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(name: &str, amount: i64) -> RecordRow {
        RecordRow::new().with("Name", name).with("Amount", amount)
    }

    fn names(rows: &[RecordRow]) -> Vec<String> {
        rows.iter().map(|r| r.text("Name")).collect()
    }

    #[test]
    fn sorts_by_amount_in_both_directions() {
        let rows = vec![opp("B", 50), opp("A", 100)];
        assert_eq!(names(&sort_rows(&rows, "Amount", SortDirection::Asc)), ["B", "A"]);
        assert_eq!(names(&sort_rows(&rows, "Amount", SortDirection::Desc)), ["A", "B"]);
    }

    #[test]
    fn descending_is_reverse_of_ascending_without_ties() {
        let rows = vec![opp("C", 7), opp("A", 3), opp("D", 12), opp("B", 5)];
        let asc = sort_rows(&rows, "Amount", SortDirection::Asc);
        let mut desc = sort_rows(&rows, "Amount", SortDirection::Desc);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn sorting_twice_is_idempotent() {
        let rows = vec![opp("C", 7), opp("A", 3), opp("B", 7)];
        let once = sort_rows(&rows, "Amount", SortDirection::Desc);
        let twice = sort_rows(&once, "Amount", SortDirection::Desc);
        assert_eq!(once, twice);
    }

    #[test]
    fn ties_keep_their_order() {
        let rows = vec![opp("first", 1), opp("second", 1), opp("third", 0)];
        assert_eq!(
            names(&sort_rows(&rows, "Amount", SortDirection::Asc)),
            ["third", "first", "second"]
        );
        assert_eq!(
            names(&sort_rows(&rows, "Amount", SortDirection::Desc)),
            ["first", "second", "third"]
        );
    }

    #[test]
    fn sort_state_reports_current_column() {
        let state = SortState {
            sorted_by: Some("Name".into()),
            sort_direction: Some(SortDirection::Desc),
        };
        assert_eq!(state.is_sorted_by("Name"), Some(SortDirection::Desc));
        assert_eq!(state.is_sorted_by("Amount"), None);
    }
}
