use std::time::Instant;

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::columns::ColumnSpec;
use crate::domain::{Command, HELP_TEXT, InputMode, Message};
use crate::format::display_cell;
use crate::inputter::{InputResult, Inputter};
use crate::record::RecordRow;
use crate::search_panel::SearchPanel;
use crate::table::{SortDirection, SortState};
use crate::table_viewer::TableViewer;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Cases,
    Opportunities,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    INPUT(InputMode),
    POPUP,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Cursor {
    row: usize,
    column: usize,
}

impl Cursor {
    fn clamp(&mut self, nrows: usize) {
        self.row = self.row.min(nrows.saturating_sub(1));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub wrap: bool,
    pub data: Vec<String>,
}

/// Everything the ui needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct UIData {
    pub view: View,
    pub account_id: String,
    pub search_term: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub is_loading: bool,
    pub error: Option<String>,
    pub summary: String,
    pub input: Option<(InputMode, InputResult)>,
    pub popup: Option<String>,
    pub status_message: String,
}

pub struct Model {
    pub status: Status,
    view: View,
    modus: Modus,
    previous_modus: Modus,
    pub cases: SearchPanel,
    pub opportunities: TableViewer,
    case_cursor: Cursor,
    opportunity_cursor: Cursor,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(account_id: &str) -> Self {
        Self {
            status: Status::READY,
            view: View::Cases,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            cases: SearchPanel::new(account_id),
            opportunities: TableViewer::new(Some(account_id.to_string())),
            case_cursor: Cursor::default(),
            opportunity_cursor: Cursor::default(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: "Started acctv!".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Key events go unmapped to the model while text is being entered.
    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::INPUT(_))
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    pub fn last_status_message_update(&self) -> Instant {
        self.last_status_message_update
    }

    pub fn update(&mut self, message: Message) -> Option<Command> {
        // Remote outcomes are applied whatever the user is doing.
        match message {
            Message::SearchSettled(query, outcome) => {
                self.cases.apply_search_settled(&query, outcome);
                self.case_cursor = Cursor::default();
                self.set_status_message(format!("{} cas", self.cases.result_count()));
                return None;
            }
            Message::OpportunitiesDelivered(delivery) => {
                self.opportunities.apply_delivery(delivery);
                self.opportunity_cursor = Cursor::default();
                self.set_status_message(format!(
                    "{} opportunités",
                    self.opportunities.result_count()
                ));
                return None;
            }
            _ => {}
        }

        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::NextView => self.next_view(),
                Message::EditSearch => self.enter_input_mode(InputMode::SearchTerm),
                Message::EditAccount => self.enter_input_mode(InputMode::AccountId),
                Message::Search => return self.search(),
                Message::Refresh => return self.refresh(),
                Message::MoveUp => self.move_row(-1),
                Message::MoveDown => self.move_row(1),
                Message::MoveLeft => self.move_column(-1),
                Message::MoveRight => self.move_column(1),
                Message::SortAscending => self.sort_current_column(SortDirection::Asc),
                Message::SortDescending => self.sort_current_column(SortDirection::Desc),
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::INPUT(mode) => {
                if let Message::RawKey(key) = message {
                    return self.raw_input(mode, key);
                }
            }
        }
        None
    }

    // -------------------- Control handling functions ---------------------- //

    fn next_view(&mut self) {
        self.view = match self.view {
            View::Cases => View::Opportunities,
            View::Opportunities => View::Cases,
        };
        trace!("Switched to {:?}", self.view);
    }

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn enter_input_mode(&mut self, mode: InputMode) {
        trace!("Entering input mode {mode:?} ...");
        let initial = match mode {
            InputMode::SearchTerm => {
                self.view = View::Cases;
                self.cases.search_term.clone()
            }
            InputMode::AccountId => self.cases.account_id.clone(),
        };
        self.previous_modus = self.modus;
        self.modus = Modus::INPUT(mode);
        self.input.set(&initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, mode: InputMode, key: KeyEvent) -> Option<Command> {
        self.last_input = self.input.read(key);
        if mode == InputMode::SearchTerm && self.last_input.changed {
            self.cases.set_search_term(self.last_input.input.clone());
        }
        if !self.last_input.finished {
            return None;
        }

        self.modus = Modus::TABLE;
        self.previous_modus = Modus::INPUT(mode);
        if self.last_input.canceled {
            return None;
        }
        match mode {
            InputMode::SearchTerm => self.search(),
            InputMode::AccountId => {
                let account_id = self.last_input.input.trim().to_string();
                self.change_account(account_id)
            }
        }
    }

    fn search(&mut self) -> Option<Command> {
        self.view = View::Cases;
        match self.cases.search() {
            Some(query) => {
                self.set_status_message(format!("Recherche de \"{}\" ...", query.subject_search_term));
                Some(Command::FindCases(query))
            }
            None => None,
        }
    }

    fn refresh(&mut self) -> Option<Command> {
        let account_id = self.opportunities.account_id.clone()?;
        self.opportunities.apply_key_changed(account_id);
        self.set_status_message("Rechargement des opportunités ...");
        Some(Command::RefreshOpportunities)
    }

    fn change_account(&mut self, account_id: String) -> Option<Command> {
        if account_id.is_empty() || account_id == self.cases.account_id {
            return None;
        }
        info!("Switching to account {account_id}");
        self.cases.set_account(account_id.clone());
        self.opportunities.apply_key_changed(account_id.clone());
        self.case_cursor = Cursor::default();
        self.opportunity_cursor = Cursor::default();
        self.set_status_message(format!("Compte {account_id}"));
        Some(Command::WireOpportunities(account_id))
    }

    fn current(&self) -> (&'static [ColumnSpec], Option<&Vec<RecordRow>>, &SortState, Cursor) {
        match self.view {
            View::Cases => (
                self.cases.columns(),
                self.cases.results.as_ref(),
                &self.cases.sort,
                self.case_cursor,
            ),
            View::Opportunities => (
                self.opportunities.columns(),
                self.opportunities.results.as_ref(),
                &self.opportunities.sort,
                self.opportunity_cursor,
            ),
        }
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        match self.view {
            View::Cases => &mut self.case_cursor,
            View::Opportunities => &mut self.opportunity_cursor,
        }
    }

    fn move_row(&mut self, step: isize) {
        let nrows = self.current().1.map_or(0, Vec::len);
        let cursor = self.cursor_mut();
        cursor.row = cursor.row.saturating_add_signed(step);
        cursor.clamp(nrows);
    }

    fn move_column(&mut self, step: isize) {
        let ncolumns = self.current().0.len();
        let cursor = self.cursor_mut();
        cursor.column = cursor
            .column
            .saturating_add_signed(step)
            .min(ncolumns.saturating_sub(1));
    }

    fn sort_current_column(&mut self, direction: SortDirection) {
        let (columns, _, _, cursor) = self.current();
        let column = columns[cursor.column];
        if !column.sortable {
            self.set_status_message(format!("{} n'est pas triable", column.label));
            return;
        }
        let sorted = match self.view {
            View::Cases => self.cases.sort(column.field_name, direction),
            View::Opportunities => self.opportunities.sort(column.field_name, direction),
        };
        debug!("Sort {} {direction}: {sorted}", column.field_name);
        if sorted {
            self.set_status_message(format!("Tri par {} ({direction})", column.label));
        } else {
            self.set_status_message("Rien à trier");
        }
    }

    fn summary(&self) -> String {
        match self.view {
            View::Cases => format!("{} cas trouvé(s)", self.cases.result_count()),
            View::Opportunities => format!("{} opportunité(s)", self.opportunities.result_count()),
        }
    }

    pub fn get_uidata(&self) -> UIData {
        let (columns, rows, sort, cursor) = self.current();
        let rows: &[RecordRow] = rows.map(Vec::as_slice).unwrap_or_default();

        let table = columns
            .iter()
            .map(|column| {
                let marker = match sort.is_sorted_by(column.field_name) {
                    Some(SortDirection::Asc) => " ▲",
                    Some(SortDirection::Desc) => " ▼",
                    None => "",
                };
                let name = format!("{}{marker}", column.label);
                let data: Vec<String> = rows.iter().map(|r| display_cell(r, column)).collect();
                let width = data
                    .iter()
                    .map(|s| s.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0);
                ColumnView {
                    name,
                    width,
                    wrap: column.wrap_text,
                    data,
                }
            })
            .collect();

        let (is_loading, error) = match self.view {
            View::Cases => (self.cases.is_loading, self.cases.error.clone()),
            View::Opportunities => (self.opportunities.is_loading, self.opportunities.error.clone()),
        };

        UIData {
            view: self.view,
            account_id: self.cases.account_id.clone(),
            search_term: self.cases.search_term.clone(),
            table,
            nrows: rows.len(),
            selected_row: cursor.row,
            selected_column: cursor.column,
            is_loading,
            error,
            summary: self.summary(),
            input: match self.modus {
                Modus::INPUT(mode) => Some((mode, self.last_input.clone())),
                _ => None,
            },
            popup: (self.modus == Modus::POPUP).then(|| HELP_TEXT.to_string()),
            status_message: self.status_message.clone(),
        }
    }
}
