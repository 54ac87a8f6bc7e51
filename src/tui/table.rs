//! Interactive service table

use crate::commands::ServiceRow;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

/// Table of services shown by `list service -i`
pub struct ServiceTable {
    rows: Vec<ServiceRow>,
    state: TableState,
    should_quit: bool,
}

impl ServiceTable {
    pub fn new(rows: Vec<ServiceRow>) -> Self {
        let mut state = TableState::default();
        if !rows.is_empty() {
            state.select(Some(0));
        }
        Self {
            rows,
            state,
            should_quit: false,
        }
    }

    /// Run the table until the user quits
    pub fn run(&mut self) -> Result<()> {
        super::with_terminal(|terminal| self.main_loop(terminal))
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Handle key press
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            _ => {}
        }
    }

    pub fn selected(&self) -> Option<&ServiceRow> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    fn select_previous(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(1));
        self.state.select(Some(i));
    }

    fn select_next(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.state.select(Some(i));
    }

    /// Render UI
    pub fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Services
                Constraint::Length(3), // Status bar
            ])
            .split(f.area());

        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                "envme",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - services on the shared network"),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
        f.render_widget(title, chunks[0]);

        self.render_services(f, chunks[1]);

        let status = Paragraph::new(format!(
            "Services: {} | ↑↓/jk: Navigate | q: Quit",
            self.rows.len()
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .style(Style::default().fg(Color::Cyan));
        f.render_widget(status, chunks[2]);
    }

    fn render_services(&mut self, f: &mut Frame, area: Rect) {
        let header = Row::new(vec!["Name", "Source", "State", "Status", "Created", "Exposed"])
            .style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .bottom_margin(1);

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|r| {
                let state_color = match r.state.as_str() {
                    "running" => Color::Green,
                    "exited" | "dead" => Color::Red,
                    "paused" | "restarting" => Color::Yellow,
                    _ => Color::Gray,
                };

                Row::new(vec![
                    Cell::from(r.name.clone()),
                    Cell::from(r.source.clone()),
                    Cell::from(r.state.clone()).style(Style::default().fg(state_color)),
                    Cell::from(r.status.clone()),
                    Cell::from(r.created.clone()),
                    Cell::from(r.exposures.join(", ")),
                ])
                .height(1)
            })
            .collect();

        let widths = [
            Constraint::Percentage(15),
            Constraint::Percentage(25),
            Constraint::Length(12),
            Constraint::Percentage(15),
            Constraint::Length(16),
            Constraint::Min(10),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Services"))
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");

        f.render_stateful_widget(table, area, &mut self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::buffer_lines;
    use ratatui::backend::TestBackend;

    fn row(name: &str, state: &str) -> ServiceRow {
        ServiceRow {
            name: name.to_string(),
            source: format!("{}:latest", name),
            state: state.to_string(),
            status: String::new(),
            created: "2026-10-19 09:30".to_string(),
            exposures: vec![format!("{}.envme.bid -> 8080", name)],
        }
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut table = ServiceTable::new(vec![row("api", "running"), row("web", "exited")]);
        assert_eq!(table.selected().map(|r| r.name.as_str()), Some("api"));

        table.handle_key(KeyCode::Down);
        table.handle_key(KeyCode::Char('j'));
        assert_eq!(table.selected().map(|r| r.name.as_str()), Some("web"));

        table.handle_key(KeyCode::Up);
        table.handle_key(KeyCode::Char('k'));
        assert_eq!(table.selected().map(|r| r.name.as_str()), Some("api"));
    }

    #[test]
    fn test_quit_keys() {
        let mut table = ServiceTable::new(Vec::new());
        table.handle_key(KeyCode::Down);
        assert!(table.selected().is_none());
        assert!(!table.should_quit);
        table.handle_key(KeyCode::Char('q'));
        assert!(table.should_quit);
    }

    #[test]
    fn test_render_lists_services() {
        let mut table = ServiceTable::new(vec![row("api", "running"), row("web", "not created")]);

        let backend = TestBackend::new(160, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| table.ui(f)).unwrap();

        let screen = buffer_lines(terminal.backend().buffer()).join("\n");
        assert!(screen.contains("Services: 2"));
        assert!(screen.contains("api:latest"));
        assert!(screen.contains("running"));
        assert!(screen.contains("web.envme.bid -> 8080"));
    }
}
