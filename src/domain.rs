use std::path::PathBuf;
use std::time::Duration;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::record::RecordRow;
use crate::remote::{CaseQuery, ServiceFailure};
use crate::wire::Delivery;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where records are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Fixture(PathBuf),
    Endpoint { url: String, token: Option<String> },
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct AppConfig {
    pub account_id: String,
    pub source: Source,
    pub event_poll_time: u64,
    pub request_timeout: Duration,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn new(account_id: impl Into<String>, source: Source) -> Self {
        Self {
            account_id: account_id.into(),
            source,
            event_poll_time: 100,
            request_timeout: Duration::from_secs(30),
            log_file: PathBuf::from("acctv.log"),
        }
    }
}

/// What the line input is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    SearchTerm,
    AccountId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    NextView,
    EditSearch,
    EditAccount,
    Search,
    Refresh,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    SortAscending,
    SortDescending,
    Help,
    Exit,
    RawKey(KeyEvent),
    SearchSettled(CaseQuery, Result<Vec<RecordRow>, ServiceFailure>),
    OpportunitiesDelivered(Delivery),
}

/// Side effects requested by the model, executed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FindCases(CaseQuery),
    WireOpportunities(String),
    RefreshOpportunities,
}

pub const HELP_TEXT: &str = "\
Tab      switch between cases and opportunities
/        edit the case search term
Enter    run the case search
a        change the account
r        reload opportunities
Left     select previous column
Right    select next column
Up/Down  move the row cursor
s        sort selected column ascending
S        sort selected column descending
?        show this help
Esc      close popup / cancel input
q        quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_setters() {
        let cfg = AppConfig::new("001A", Source::Fixture("data.json".into()))
            .with_event_poll_time(250)
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(cfg.account_id, "001A");
        assert_eq!(cfg.event_poll_time, 250);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.log_file, PathBuf::from("acctv.log"));
    }
}
