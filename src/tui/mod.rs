//! envme TUI (Terminal User Interface)
//!
//! Interactive forms that collect missing command arguments, and the
//! service table shown by `list service -i`.

pub mod form;
pub mod forms;
pub mod table;

pub use form::{Field, Form, FormState};
pub use table::ServiceTable;

use crate::error::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, Stdout};

/// Run `f` on a raw-mode alternate screen, restoring the terminal afterwards
pub fn with_terminal<T>(
    f: impl FnOnce(&mut Terminal<CrosstermBackend<Stdout>>) -> Result<T>,
) -> Result<T> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = f(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Flatten a rendered test buffer into one string per row
#[cfg(test)]
pub(crate) fn buffer_lines(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
    let width = buffer.area.width as usize;
    buffer
        .content
        .chunks(width)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect()
}
