use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::domain::InputMode;
use crate::model::{Model, UIData, View};

pub const HEADER_HEIGHT: u16 = 3;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const MAX_COLUMN_WIDTH: usize = 30;
pub const WRAP_COLUMN_WIDTH: usize = 40;
pub const COLUMN_SPACING: u16 = 2;
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [header, body, statusline] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        self.render_header(&uidata, frame, header);
        self.render_table(&uidata, frame, body);

        let show_status = model.last_status_message_update().elapsed() < STATUS_MESSAGE_TTL;
        Self::render_statusline(&uidata, show_status, frame, statusline);

        if let Some(message) = &uidata.popup {
            Self::render_popup(message, frame);
        }
    }

    fn render_header(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let selected = match uidata.view {
            View::Cases => 0,
            View::Opportunities => 1,
        };
        let tabs = Tabs::new(vec![" Cas ", " Opportunités "])
            .select(selected)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow));

        let block = Block::bordered()
            .title(Line::from(" acctv ".bold()).centered())
            .border_set(border::THICK);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [tabs_area, field_area] =
            Layout::horizontal([Constraint::Length(26), Constraint::Min(10)]).areas(inner);
        frame.render_widget(tabs, tabs_area);

        let (label, value, editing) = match &uidata.input {
            Some((InputMode::SearchTerm, input)) => ("Recherche: ", input.input.clone(), Some(input.cursor_pos)),
            Some((InputMode::AccountId, input)) => ("Compte: ", input.input.clone(), Some(input.cursor_pos)),
            None => match uidata.view {
                View::Cases => ("Recherche: ", uidata.search_term.clone(), None),
                View::Opportunities => ("Compte: ", uidata.account_id.clone(), None),
            },
        };
        let line = Line::from(vec![
            Span::raw(label).blue().bold(),
            if editing.is_some() {
                Span::raw(value).yellow().underlined()
            } else {
                Span::raw(value)
            },
        ]);
        frame.render_widget(Paragraph::new(line), field_area);

        if let Some(pos) = editing {
            let x = field_area.x + label.chars().count() as u16 + pos as u16;
            frame.set_cursor_position((x.min(field_area.right().saturating_sub(1)), field_area.y));
        }
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        if uidata.is_loading {
            lines.push(Line::from("Chargement ...".italic().dark_gray()));
        }
        if let Some(error) = &uidata.error {
            lines.push(Line::from(error.clone().red()));
        }
        let [message_area, table_area] =
            Layout::vertical([Constraint::Length(lines.len() as u16), Constraint::Min(1)]).areas(area);
        frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), message_area);

        let widths: Vec<usize> = uidata
            .table
            .iter()
            .map(|c| {
                if c.wrap {
                    c.width.min(WRAP_COLUMN_WIDTH)
                } else {
                    c.width.min(MAX_COLUMN_WIDTH)
                }
            })
            .collect();

        let header = Row::new(uidata.table.iter().map(|c| Cell::from(c.name.clone())))
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1);

        let rows = (0..uidata.nrows).map(|ridx| {
            let cells: Vec<Vec<String>> = uidata
                .table
                .iter()
                .zip(&widths)
                .map(|(column, &width)| {
                    let value = &column.data[ridx];
                    if column.wrap {
                        wrap_text(value, width)
                    } else {
                        vec![truncate(value, width)]
                    }
                })
                .collect();
            let height = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            Row::new(cells.into_iter().map(|lines| Cell::from(Text::from(lines.join("\n")))))
                .height(height as u16)
        });

        let constraints = widths.iter().map(|&w| Constraint::Length(w as u16));
        let table = Table::new(rows, constraints)
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .column_highlight_style(Style::default().fg(Color::Yellow))
            .block(Block::bordered().border_set(border::PLAIN));

        if uidata.nrows > 0 {
            self.table_state.select(Some(uidata.selected_row));
        } else {
            self.table_state.select(None);
        }
        self.table_state.select_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, table_area, &mut self.table_state);
    }

    fn render_statusline(uidata: &UIData, show_status: bool, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::raw(uidata.summary.clone()).bold()];
        if show_status {
            spans.push(Span::raw(" | "));
            spans.push(Span::raw(uidata.status_message.clone()).dark_gray());
        }
        let help = Line::from(vec![" Aide ".into(), "<?> ".blue().bold(), " Quitter ".into(), "<Q> ".blue().bold()]);
        let [left, right] =
            Layout::horizontal([Constraint::Min(10), Constraint::Length(help.width() as u16)]).areas(area);
        frame.render_widget(Paragraph::new(Line::from(spans)), left);
        frame.render_widget(Paragraph::new(help), right);
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let height = message.lines().count() as u16 + 2;
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let popup = Paragraph::new(message.to_string()).block(
            Block::bordered()
                .title(Line::from(" Aide ".bold()).centered())
                .border_set(border::THICK),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

/// Greedy word wrap on character counts.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
