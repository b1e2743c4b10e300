use tracing::{error, trace};

use crate::columns::{CLOSE_DATE_PARTS, ColumnSpec, OPPORTUNITY_CLOSE_DATE, OPPORTUNITY_COLUMNS};
use crate::format::{format_date, parse_timestamp};
use crate::record::RecordRow;
use crate::remote::normalize_error;
use crate::table::{SortDirection, SortState, sort_rows};
use crate::wire::Delivery;

pub const LOAD_FAILED_PREFIX: &str = "Une erreur est survenue lors du chargement des opportunités : ";

/// Opportunities of one account, fed by a wired subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableViewer {
    pub account_id: Option<String>,
    pub results: Option<Vec<RecordRow>>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub sort: SortState,
}

impl TableViewer {
    pub fn new(account_id: Option<String>) -> Self {
        let is_loading = account_id.is_some();
        Self {
            account_id,
            is_loading,
            ..Self::default()
        }
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        &OPPORTUNITY_COLUMNS
    }

    /// The subscription was rekeyed, a delivery is on its way.
    pub fn apply_key_changed(&mut self, account_id: impl Into<String>) {
        self.account_id = Some(account_id.into());
        self.is_loading = true;
    }

    pub fn apply_delivery(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Data(rows) => {
                trace!("Received {} opportunities", rows.len());
                self.results = Some(format_opportunities(rows));
                self.error = None;
                self.sort = SortState::default();
            }
            Delivery::Error(failure) => {
                error!("Loading opportunities failed: {failure:?}");
                self.error = Some(format!("{LOAD_FAILED_PREFIX}{}", normalize_error(&failure)));
                self.results = None;
            }
        }
        self.is_loading = false;
    }

    pub fn has_results(&self) -> bool {
        self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn result_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    /// Sort the current snapshot. No-op returning false when nothing has
    /// been delivered yet.
    pub fn sort(&mut self, field: &str, direction: SortDirection) -> bool {
        let Some(rows) = &self.results else {
            return false;
        };
        self.results = Some(sort_rows(rows, field, direction));
        self.sort = SortState {
            sorted_by: Some(field.to_string()),
            sort_direction: Some(direction),
        };
        true
    }
}

/// Replace each raw close date with its display string.
fn format_opportunities(rows: Vec<RecordRow>) -> Vec<RecordRow> {
    rows.into_iter()
        .map(|mut row| {
            if let Some(dt) = row.get(OPPORTUNITY_CLOSE_DATE).and_then(parse_timestamp) {
                row.set(OPPORTUNITY_CLOSE_DATE, format_date(&dt, &CLOSE_DATE_PARTS));
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ServiceFailure;

    fn opp(name: &str, amount: i64) -> RecordRow {
        RecordRow::new()
            .with("Name", name)
            .with("Amount", amount)
            .with("CloseDate", "2024-03-05")
            .with("StageName", "Prospecting")
    }

    fn names(viewer: &TableViewer) -> Vec<String> {
        viewer
            .results
            .as_ref()
            .unwrap()
            .iter()
            .map(|r| r.text("Name"))
            .collect()
    }

    fn loaded(rows: Vec<RecordRow>) -> TableViewer {
        let mut viewer = TableViewer::new(Some("001A".into()));
        viewer.apply_delivery(Delivery::Data(rows));
        viewer
    }

    #[test]
    fn data_is_formatted_and_counted() {
        let viewer = loaded(vec![opp("B", 50), opp("A", 100)]);
        assert!(viewer.has_results());
        assert_eq!(viewer.result_count(), 2);
        assert!(viewer.error.is_none());
        assert!(!viewer.is_loading);
        assert_eq!(viewer.results.as_ref().unwrap()[0].text("CloseDate"), "5 mars 2024");
    }

    #[test]
    fn sorts_by_amount() {
        let mut viewer = loaded(vec![opp("B", 50), opp("A", 100)]);
        assert!(viewer.sort("Amount", SortDirection::Asc));
        assert_eq!(names(&viewer), ["B", "A"]);
        assert!(viewer.sort("Amount", SortDirection::Desc));
        assert_eq!(names(&viewer), ["A", "B"]);
        assert_eq!(viewer.sort.sorted_by.as_deref(), Some("Amount"));
        assert_eq!(viewer.sort.sort_direction, Some(SortDirection::Desc));
    }

    #[test]
    fn sort_without_results_is_a_noop() {
        let mut viewer = TableViewer::new(None);
        assert!(!viewer.sort("Amount", SortDirection::Asc));
        assert_eq!(viewer.sort, SortState::default());
        assert!(viewer.results.is_none());
    }

    #[test]
    fn error_clears_results_and_data_recovers() {
        let mut viewer = loaded(vec![opp("A", 100)]);
        viewer.apply_delivery(Delivery::Error(ServiceFailure::generic("timeout")));
        assert!(viewer.results.is_none());
        assert!(!viewer.has_results());
        assert_eq!(
            viewer.error.as_deref(),
            Some("Une erreur est survenue lors du chargement des opportunités : timeout")
        );

        viewer.apply_delivery(Delivery::Data(vec![opp("B", 50)]));
        assert!(viewer.error.is_none());
        assert_eq!(viewer.result_count(), 1);
    }

    #[test]
    fn empty_data_is_not_an_error() {
        let viewer = loaded(Vec::new());
        assert!(!viewer.has_results());
        assert_eq!(viewer.result_count(), 0);
        assert!(viewer.error.is_none());
    }

    #[test]
    fn rekey_marks_loading_until_delivery() {
        let mut viewer = loaded(vec![opp("A", 100)]);
        viewer.apply_key_changed("001B");
        assert!(viewer.is_loading);
        assert_eq!(viewer.account_id.as_deref(), Some("001B"));
        viewer.apply_delivery(Delivery::Data(Vec::new()));
        assert!(!viewer.is_loading);
    }

    #[test]
    fn unparseable_close_dates_are_kept() {
        let row = RecordRow::new().with("Name", "X").with("CloseDate", "soon");
        let viewer = loaded(vec![row]);
        assert_eq!(viewer.results.as_ref().unwrap()[0].text("CloseDate"), "soon");
    }
}
