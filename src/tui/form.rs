//! Generic terminal form
//!
//! A [`Form`] is a vertical list of fields with one focused at a time and a
//! preview panel on the right. Key handling is separate from the terminal
//! loop so forms can be driven directly in tests.

use crate::error::{EnvmeError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::time::Duration;

/// Label of the confirm button that completes a form
pub const AFFIRMATIVE: &str = "Yep";
/// Label of the confirm button that keeps editing
pub const NEGATIVE: &str = "Wait, no";
/// Error shown when a form is submitted without confirming
pub const NOT_DONE: &str = "Welp, finish up then";

const FORM_WIDTH: u16 = 55;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldKind {
    Input,
    Text,
    Select { options: Vec<String>, selected: usize },
    Confirm { yes: bool },
}

/// One form field
#[derive(Debug, Clone)]
pub struct Field {
    key: &'static str,
    title: &'static str,
    description: Option<&'static str>,
    placeholder: &'static str,
    /// Error shown when the field is left empty
    required: Option<&'static str>,
    kind: FieldKind,
    value: String,
}

impl Field {
    fn new(key: &'static str, title: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            title,
            description: None,
            placeholder: "",
            required: None,
            kind,
            value: String::new(),
        }
    }

    /// Single-line input
    pub fn input(key: &'static str, title: &'static str) -> Self {
        Self::new(key, title, FieldKind::Input)
    }

    /// Multi-line text; Enter inserts a newline
    pub fn text(key: &'static str, title: &'static str) -> Self {
        Self::new(key, title, FieldKind::Text)
    }

    /// Choice between fixed options, cycled with Left/Right
    pub fn select<I, S>(key: &'static str, title: &'static str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(key, title, FieldKind::Select { options, selected: 0 })
    }

    /// Yes/no confirmation that submits the form
    pub fn confirm(key: &'static str, title: &'static str) -> Self {
        Self::new(key, title, FieldKind::Confirm { yes: false })
    }

    pub fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }

    /// Prefill the field; for selects this picks the matching option
    pub fn value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        match &mut self.kind {
            FieldKind::Select { options, selected } => {
                if let Some(i) = options.iter().position(|o| *o == value) {
                    *selected = i;
                }
            }
            FieldKind::Confirm { yes } => *yes = value == AFFIRMATIVE,
            FieldKind::Input | FieldKind::Text => self.value = value,
        }
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Entered text, chosen option, or confirm button label
    pub fn current(&self) -> &str {
        match &self.kind {
            FieldKind::Select { options, selected } => {
                options.get(*selected).map(String::as_str).unwrap_or("")
            }
            FieldKind::Confirm { yes: true } => AFFIRMATIVE,
            FieldKind::Confirm { yes: false } => NEGATIVE,
            FieldKind::Input | FieldKind::Text => &self.value,
        }
    }

    fn check_required(&self) -> std::result::Result<(), &'static str> {
        match self.required {
            Some(message) if self.current().trim().is_empty() => Err(message),
            _ => Ok(()),
        }
    }

    fn lines(&self, focused: bool) -> Vec<Line<'_>> {
        let accent = Style::default().fg(Color::Cyan);
        let marker = if focused {
            Span::styled("┃ ", accent)
        } else {
            Span::raw("  ")
        };
        let title_style = if focused {
            accent.add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut lines = vec![Line::from(vec![
            marker.clone(),
            Span::styled(self.title, title_style),
        ])];
        if let Some(description) = self.description {
            lines.push(Line::from(vec![
                marker.clone(),
                Span::styled(description, Style::default().fg(Color::Gray)),
            ]));
        }

        let placeholder = Style::default().fg(Color::DarkGray);
        match &self.kind {
            FieldKind::Input | FieldKind::Text if self.value.is_empty() => {
                lines.push(Line::from(vec![
                    marker.clone(),
                    Span::styled(self.placeholder, placeholder),
                ]));
            }
            FieldKind::Input | FieldKind::Text => {
                let count = self.value.split('\n').count();
                for (i, line) in self.value.split('\n').enumerate() {
                    let mut spans = vec![marker.clone(), Span::raw(line)];
                    if focused && i + 1 == count {
                        spans.push(Span::styled("█", accent));
                    }
                    lines.push(Line::from(spans));
                }
            }
            FieldKind::Select { .. } => {
                let (left, right) = if focused { ("‹ ", " ›") } else { ("  ", "") };
                lines.push(Line::from(vec![
                    marker.clone(),
                    Span::styled(left, accent),
                    Span::raw(self.current()),
                    Span::styled(right, accent),
                ]));
            }
            FieldKind::Confirm { yes } => {
                let active = Style::default().fg(Color::Black).bg(Color::Cyan);
                let inactive = Style::default().fg(Color::Gray);
                let (yes_style, no_style) = if *yes {
                    (active, inactive)
                } else {
                    (inactive, active)
                };
                lines.push(Line::from(vec![
                    marker.clone(),
                    Span::styled(format!(" {} ", AFFIRMATIVE), yes_style),
                    Span::raw("  "),
                    Span::styled(format!(" {} ", NEGATIVE), no_style),
                ]));
            }
        }

        lines
    }
}

/// Where a form is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Editing,
    Completed,
    Aborted,
}

/// Terminal form
#[derive(Debug, Clone)]
pub struct Form {
    title: String,
    fields: Vec<Field>,
    focus: usize,
    error: Option<String>,
    state: FormState,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
            focus: 0,
            error: None,
            state: FormState::Editing,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Index of the focused field
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Current value of a field, empty for unknown keys
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(Field::current)
            .unwrap_or("")
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyEvent) -> FormState {
        if key.kind != KeyEventKind::Press || self.state != FormState::Editing {
            return self.state;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.state = FormState::Aborted,
            KeyCode::Char('c') if ctrl => self.state = FormState::Aborted,
            KeyCode::Tab | KeyCode::Down => self.next(),
            KeyCode::BackTab | KeyCode::Up => self.previous(),
            KeyCode::Enter => self.enter(),
            KeyCode::Left => self.cycle(false),
            KeyCode::Right => self.cycle(true),
            KeyCode::Backspace => {
                if let Some(field) = self.editable() {
                    field.value.pop();
                }
            }
            KeyCode::Char(c) if !ctrl => self.insert(c),
            _ => {}
        }

        self.state
    }

    fn focused(&self) -> &Field {
        &self.fields[self.focus]
    }

    fn editable(&mut self) -> Option<&mut Field> {
        let field = self.fields.get_mut(self.focus)?;
        matches!(field.kind, FieldKind::Input | FieldKind::Text).then_some(field)
    }

    fn insert(&mut self, c: char) {
        if let Some(field) = self.editable() {
            field.value.push(c);
            self.error = None;
        }
    }

    fn next(&mut self) {
        if let Err(message) = self.focused().check_required() {
            self.error = Some(message.to_string());
            return;
        }
        self.error = None;
        if self.focus + 1 < self.fields.len() {
            self.focus += 1;
        }
    }

    fn previous(&mut self) {
        self.error = None;
        self.focus = self.focus.saturating_sub(1);
    }

    fn enter(&mut self) {
        let kind = &self.focused().kind;
        if matches!(kind, FieldKind::Text) {
            self.insert('\n');
        } else if matches!(kind, FieldKind::Confirm { .. }) {
            self.submit();
        } else {
            self.next();
        }
    }

    fn cycle(&mut self, forward: bool) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match &mut field.kind {
            FieldKind::Select { options, selected } if !options.is_empty() => {
                let len = options.len();
                *selected = if forward {
                    (*selected + 1) % len
                } else {
                    (*selected + len - 1) % len
                };
            }
            FieldKind::Confirm { yes } => *yes = !*yes,
            _ => return,
        }
        self.error = None;
    }

    fn submit(&mut self) {
        for (i, field) in self.fields.iter().enumerate() {
            if let Err(message) = field.check_required() {
                self.focus = i;
                self.error = Some(message.to_string());
                return;
            }
        }

        if self
            .fields
            .iter()
            .any(|f| matches!(f.kind, FieldKind::Confirm { yes: false }))
        {
            self.error = Some(NOT_DONE.to_string());
            return;
        }

        self.error = None;
        self.state = FormState::Completed;
    }

    /// Run the form on the terminal until it completes or is aborted.
    ///
    /// `preview` returns the title and body of the right-hand panel for the
    /// current field values.
    pub fn run<P>(mut self, preview: P) -> Result<Form>
    where
        P: Fn(&Form) -> (String, String),
    {
        super::with_terminal(|terminal| loop {
            let (title, body) = preview(&self);
            terminal.draw(|f| self.render(f, &title, &body))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            match self.state {
                FormState::Editing => {}
                FormState::Completed => return Ok(()),
                FormState::Aborted => return Err(EnvmeError::Cancelled),
            }
        })?;

        Ok(self)
    }

    /// Render the form with a preview panel
    pub fn render(&self, f: &mut Frame, preview_title: &str, preview: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Fields + preview
                Constraint::Length(3), // Help
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(FORM_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);

        let mut lines = Vec::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                lines.push(Line::from(""));
            }
            lines.extend(field.lines(i == self.focus));
        }
        let fields = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
        f.render_widget(fields, body[0]);

        let preview = Paragraph::new(preview)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(preview_title)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(preview, body[1]);

        let help = Paragraph::new(
            "tab/↓ next • shift+tab/↑ back • ←/→ choose • enter confirm • esc quit",
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .style(Style::default().fg(Color::Gray));
        f.render_widget(help, chunks[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let (text, color) = match &self.error {
            Some(error) => (error.as_str(), Color::Red),
            None => (self.title.as_str(), Color::Cyan),
        };
        let header = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        f.render_widget(header, area);
    }
}
