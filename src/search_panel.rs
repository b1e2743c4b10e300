use tracing::{debug, error, info, trace};

use crate::columns::{CASE_COLUMNS, CASE_CREATED_DATE, ColumnSpec};
use crate::format::{iso_timestamp, parse_timestamp};
use crate::record::RecordRow;
use crate::remote::{CaseQuery, ServiceFailure, normalize_error};
use crate::table::{SortDirection, SortState, sort_rows};

pub const EMPTY_TERM_MESSAGE: &str = "Veuillez entrer un terme de recherche";
pub const NO_CASES_MESSAGE: &str = "Aucun cas trouvé pour ce terme de recherche";
pub const SEARCH_FAILED_PREFIX: &str = "Une erreur est survenue lors de la recherche des cas : ";

/// Case search bound to one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPanel {
    pub account_id: String,
    pub search_term: String,
    pub results: Option<Vec<RecordRow>>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub sort: SortState,
}

impl SearchPanel {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Self::default()
        }
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        &CASE_COLUMNS
    }

    /// Store the term. An empty term clears results and error right away.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        if self.search_term.is_empty() {
            self.results = None;
            self.error = None;
        }
    }

    /// Rebind the panel to another account, dropping what was shown for the
    /// previous one.
    pub fn set_account(&mut self, account_id: impl Into<String>) {
        self.account_id = account_id.into();
        self.results = None;
        self.error = None;
        self.sort = SortState::default();
    }

    /// Validate the term and mark the search as started. Returns the query
    /// to dispatch, or `None` when the term is empty.
    pub fn search(&mut self) -> Option<CaseQuery> {
        if self.search_term.is_empty() {
            self.error = Some(EMPTY_TERM_MESSAGE.to_string());
            return None;
        }
        self.apply_search_started();
        let query = CaseQuery {
            account_id: self.account_id.clone(),
            subject_search_term: self.search_term.clone(),
        };
        info!("Searching cases of {} for {:?}", query.account_id, query.subject_search_term);
        Some(query)
    }

    pub fn apply_search_started(&mut self) {
        self.is_loading = true;
        self.results = None;
        self.error = None;
    }

    pub fn apply_search_succeeded(&mut self, rows: Vec<RecordRow>) {
        let rows = format_cases(rows);
        trace!("Case search returned {} rows", rows.len());
        self.error = if rows.is_empty() {
            Some(NO_CASES_MESSAGE.to_string())
        } else {
            None
        };
        self.results = Some(rows);
        self.sort = SortState::default();
    }

    pub fn apply_search_failed(&mut self, failure: &ServiceFailure) {
        error!("Case search failed: {failure:?}");
        self.results = None;
        self.error = Some(format!("{SEARCH_FAILED_PREFIX}{}", normalize_error(failure)));
    }

    /// Apply the outcome of a dispatched search. Loading ends whatever the
    /// outcome was. Outcomes of a query for another account are dropped.
    pub fn apply_search_settled(
        &mut self,
        query: &CaseQuery,
        outcome: Result<Vec<RecordRow>, ServiceFailure>,
    ) {
        if query.account_id != self.account_id {
            debug!("Dropping case search of former account {}", query.account_id);
        } else {
            match outcome {
                Ok(rows) => self.apply_search_succeeded(rows),
                Err(failure) => self.apply_search_failed(&failure),
            }
        }
        self.is_loading = false;
    }

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

    pub fn result_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }
}

/// Replace each raw creation date with its parsed, canonical form.
fn format_cases(rows: Vec<RecordRow>) -> Vec<RecordRow> {
    rows.into_iter()
        .map(|mut row| {
            if let Some(dt) = row.get(CASE_CREATED_DATE).and_then(parse_timestamp) {
                row.set(CASE_CREATED_DATE, iso_timestamp(&dt));
            }
            row
        })
        .collect()
}
