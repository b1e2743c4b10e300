use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::AppError;
use crate::record::RecordRow;

/// Fixed text used when a failure carries no message at all.
pub const UNKNOWN_ERROR: &str = "Erreur inconnue";

/// Field scoping every record to its account.
pub const ACCOUNT_FIELD: &str = "AccountId";
pub const SUBJECT_FIELD: &str = "Subject";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FailureBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
}

/// Failure payload of a remote call. `body` holds what the service itself
/// reported, `message` a generic description (transport or status errors).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceFailure {
    #[serde(default)]
    pub body: Option<FailureBody>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceFailure {
    pub fn service(message: impl Into<String>) -> Self {
        Self {
            body: Some(FailureBody {
                message: Some(message.into()),
                error_code: None,
            }),
            message: None,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            body: None,
            message: Some(message.into()),
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        Self::generic(err.to_string())
    }

    /// Decode an error response. The service answers either with a single
    /// `{ "message": .. }` object or with a list of them.
    fn from_response(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<FailureBody>(text).ok().or_else(|| {
            serde_json::from_str::<Vec<FailureBody>>(text)
                .ok()
                .and_then(|list| list.into_iter().next())
        });
        Self {
            body,
            message: Some(format!("HTTP {status}")),
        }
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Best effort human readable text for a failure: the service message,
/// else the generic message, else [`UNKNOWN_ERROR`].
pub fn normalize_error(failure: &ServiceFailure) -> String {
    failure
        .body
        .as_ref()
        .and_then(|b| non_empty(&b.message))
        .or_else(|| non_empty(&failure.message))
        .unwrap_or(UNKNOWN_ERROR)
        .to_string()
}

/// Parameters of a case lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseQuery {
    pub account_id: String,
    pub subject_search_term: String,
}

#[async_trait]
pub trait RecordService: Send + Sync {
    /// Cases of the account whose subject matches the term.
    async fn find_cases_by_subject(
        &self,
        account_id: &str,
        subject_search_term: &str,
    ) -> Result<Vec<RecordRow>, ServiceFailure>;

    /// Opportunities of the account.
    async fn get_opportunities(&self, account_id: &str) -> Result<Vec<RecordRow>, ServiceFailure>;
}

/// Client for the remote read endpoints.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpService {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<RecordRow>, ServiceFailure> {
        let url = format!("{}/{}", self.endpoint, path);
        debug!("GET {url} {query:?}");

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ServiceFailure::transport)?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<Vec<RecordRow>>()
                .await
                .map_err(ServiceFailure::transport)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ServiceFailure::from_response(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl RecordService for HttpService {
    async fn find_cases_by_subject(
        &self,
        account_id: &str,
        subject_search_term: &str,
    ) -> Result<Vec<RecordRow>, ServiceFailure> {
        self.fetch(
            "cases",
            &[("accountId", account_id), ("subjectSearchTerm", subject_search_term)],
        )
        .await
    }

    async fn get_opportunities(&self, account_id: &str) -> Result<Vec<RecordRow>, ServiceFailure> {
        self.fetch("opportunities", &[("accountId", account_id)]).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    cases: Vec<RecordRow>,
    #[serde(default)]
    opportunities: Vec<RecordRow>,
}

/// Serves records from a local json file of the form
/// `{ "cases": [..], "opportunities": [..] }`.
#[derive(Debug, Default)]
pub struct FixtureService {
    cases: Vec<RecordRow>,
    opportunities: Vec<RecordRow>,
}

impl FixtureService {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| AppError::LoadingFailed(format!("{}: {e}", path.display())))?;
        let service = Self::from_json(&text)?;
        info!(
            "Loaded fixture {} with {} cases and {} opportunities",
            path.display(),
            service.cases.len(),
            service.opportunities.len()
        );
        Ok(service)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let fixture: Fixture = serde_json::from_str(text)?;
        Ok(Self {
            cases: fixture.cases,
            opportunities: fixture.opportunities,
        })
    }

    fn for_account<'a>(rows: &'a [RecordRow], account_id: &'a str) -> impl Iterator<Item = &'a RecordRow> {
        rows.iter().filter(move |r| r.text(ACCOUNT_FIELD) == account_id)
    }
}

#[async_trait]
impl RecordService for FixtureService {
    async fn find_cases_by_subject(
        &self,
        account_id: &str,
        subject_search_term: &str,
    ) -> Result<Vec<RecordRow>, ServiceFailure> {
        let term = subject_search_term.to_lowercase();
        Ok(Self::for_account(&self.cases, account_id)
            .filter(|r| r.text(SUBJECT_FIELD).to_lowercase().contains(&term))
            .cloned()
            .collect())
    }

    async fn get_opportunities(&self, account_id: &str) -> Result<Vec<RecordRow>, ServiceFailure> {
        Ok(Self::for_account(&self.opportunities, account_id)
            .cloned()
            .collect())
    }
}
