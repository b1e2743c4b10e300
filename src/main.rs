use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use ratatui::DefaultTerminal;
use tracing::{error, info};

mod columns;
mod controller;
mod domain;
mod format;
mod inputter;
mod logging;
mod model;
mod record;
mod remote;
mod search_panel;
mod table;
mod table_viewer;
mod ui;
mod wire;

use controller::Controller;
use domain::{AppConfig, AppError, Source};
use model::{Model, Status};
use remote::{FixtureService, HttpService, RecordService};
use ui::TableUI;

/// A tui account viewer: search the cases of an account and browse its
/// opportunities.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["fixture", "endpoint"])))]
struct Args {
    /// Account whose records are shown
    #[arg(short, long, env = "ACCTV_ACCOUNT")]
    account: String,

    /// Json file with `cases` and `opportunities` arrays
    #[arg(short, long, env = "ACCTV_FIXTURE")]
    fixture: Option<String>,

    /// Base url of the record service
    #[arg(short, long, env = "ACCTV_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token sent to the record service
    #[arg(long, env = "ACCTV_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Timeout of a single remote call
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Where logs are written
    #[arg(long, default_value = "acctv.log")]
    log_file: String,

    /// Terminal event poll interval
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn expand(path: &str) -> Result<PathBuf, AppError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| AppError::InvalidConfig(e.to_string()))
}

impl Args {
    fn into_config(self) -> Result<AppConfig, AppError> {
        let account = self.account.trim().to_string();
        if account.is_empty() {
            return Err(AppError::InvalidConfig("account must not be empty".into()));
        }
        let source = match (self.fixture, self.endpoint) {
            (Some(path), None) => Source::Fixture(expand(&path)?),
            (None, Some(url)) => Source::Endpoint {
                url,
                token: self.token,
            },
            _ => return Err(AppError::InvalidConfig("give either --fixture or --endpoint".into())),
        };
        Ok(AppConfig::new(account, source)
            .with_event_poll_time(self.poll_ms)
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_log_file(expand(&self.log_file)?))
    }
}

fn main() -> ExitCode {
    let result = Args::parse().into_config().and_then(|cfg| {
        logging::init(&cfg.log_file)?;
        run(&cfg)
    });
    match result {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn build_service(cfg: &AppConfig) -> Result<Arc<dyn RecordService>, AppError> {
    let service: Arc<dyn RecordService> = match &cfg.source {
        Source::Fixture(path) => Arc::new(FixtureService::load(path)?),
        Source::Endpoint { url, token } => {
            Arc::new(HttpService::new(url, token.clone(), cfg.request_timeout)?)
        }
    };
    Ok(service)
}

fn run(cfg: &AppConfig) -> Result<(), AppError> {
    info!("Starting acctv for account {}", cfg.account_id);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let service = build_service(cfg)?;

    let mut model = Model::init(&cfg.account_id);
    let mut ui = TableUI::new();
    let mut controller = Controller::new(cfg, runtime.handle().clone(), service);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &mut controller);
    ratatui::restore();

    controller.shutdown();
    runtime.shutdown_timeout(Duration::from_millis(500));
    info!("Bye");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &mut Controller,
) -> Result<(), AppError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)?
            && let Some(command) = model.update(message)
        {
            controller.dispatch(command);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_args_build_a_config() {
        let args = Args::try_parse_from([
            "acctv", "--account", "001A", "--fixture", "data.json", "--poll-ms", "50",
        ])
        .unwrap();
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.account_id, "001A");
        assert_eq!(cfg.source, Source::Fixture(PathBuf::from("data.json")));
        assert_eq!(cfg.event_poll_time, 50);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn endpoint_args_carry_the_token() {
        let args = Args::try_parse_from([
            "acctv",
            "--account",
            "001A",
            "--endpoint",
            "https://example.test/api",
            "--token",
            "secret",
        ])
        .unwrap();
        let cfg = args.into_config().unwrap();
        assert_eq!(
            cfg.source,
            Source::Endpoint {
                url: "https://example.test/api".into(),
                token: Some("secret".into())
            }
        );
    }

    #[test]
    fn a_source_is_required_and_exclusive() {
        assert!(Args::try_parse_from(["acctv", "--account", "001A"]).is_err());
        assert!(
            Args::try_parse_from([
                "acctv", "--account", "001A", "--fixture", "a.json", "--endpoint", "http://x",
            ])
            .is_err()
        );
    }

    #[test]
    fn blank_account_is_rejected() {
        let args = Args::try_parse_from(["acctv", "--account", " ", "--fixture", "a.json"]).unwrap();
        assert!(matches!(args.into_config(), Err(AppError::InvalidConfig(_))));
    }
}
