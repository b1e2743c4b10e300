use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, trace};

use crate::domain::{AppConfig, AppError, Command, Message};
use crate::model::Model;
use crate::remote::RecordService;
use crate::wire::Subscription;

/// Turns terminal events and remote outcomes into messages, and runs the
/// commands the model asks for.
pub struct Controller {
    event_poll_time: u64,
    runtime: Handle,
    service: Arc<dyn RecordService>,
    outcomes_tx: UnboundedSender<Message>,
    outcomes: UnboundedReceiver<Message>,
    subscription: Subscription,
}

impl Controller {
    pub fn new(cfg: &AppConfig, runtime: Handle, service: Arc<dyn RecordService>) -> Self {
        let (outcomes_tx, outcomes) = mpsc::unbounded_channel();
        let tx = outcomes_tx.clone();
        let subscription = Subscription::wire(
            &runtime,
            Arc::clone(&service),
            Some(cfg.account_id.clone()),
            move |delivery| {
                // The receiver is gone once the ui shut down
                let _ = tx.send(Message::OpportunitiesDelivered(delivery));
            },
        );
        Self {
            event_poll_time: cfg.event_poll_time,
            runtime,
            service,
            outcomes_tx,
            outcomes,
            subscription,
        }
    }

    pub fn handle_event(&mut self, model: &Model) -> Result<Option<Message>, AppError> {
        if let Some(message) = self.next_outcome() {
            return Ok(Some(message));
        }
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(self.handle_key(model, key));
        }
        Ok(None)
    }

    fn next_outcome(&mut self) -> Option<Message> {
        self.outcomes.try_recv().ok()
    }

    fn handle_key(&self, model: &Model, key: event::KeyEvent) -> Option<Message> {
        if model.raw_keyevents() {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Tab => Some(Message::NextView),
            KeyCode::Char('/') => Some(Message::EditSearch),
            KeyCode::Char('a') => Some(Message::EditAccount),
            KeyCode::Enter => Some(Message::Search),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('s') => Some(Message::SortAscending),
            KeyCode::Char('S') => Some(Message::SortDescending),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::FindCases(query) => {
                let service = Arc::clone(&self.service);
                let tx = self.outcomes_tx.clone();
                self.runtime.spawn(async move {
                    let outcome = service
                        .find_cases_by_subject(&query.account_id, &query.subject_search_term)
                        .await;
                    let _ = tx.send(Message::SearchSettled(query, outcome));
                });
            }
            Command::WireOpportunities(account_id) => {
                info!(
                    "Rewiring opportunities from {:?} to {account_id}",
                    self.subscription.key()
                );
                self.subscription.set_key(Some(account_id));
            }
            Command::RefreshOpportunities => self.subscription.refresh(),
        }
    }

    pub fn shutdown(self) {
        self.subscription.unsubscribe();
    }
}
