//! Main application logic

use std::io;
use std::time::Duration;

use anyhow::Result;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};
use tokio::sync::broadcast;

use crate::{actors::messages::ChartUpdate, render::ChartRegion, storage::TimeSeriesStore};

use super::{
    state::{StreamStatus, ViewState},
    ui,
};

/// Terminal dashboard drawing every chart region
pub struct App {
    state: ViewState,
    updates: broadcast::Receiver<ChartUpdate>,
    store: TimeSeriesStore,
}

impl App {
    pub fn new(
        title: impl Into<String>,
        regions: Vec<ChartRegion>,
        updates: broadcast::Receiver<ChartUpdate>,
        store: TimeSeriesStore,
    ) -> Self {
        Self {
            state: ViewState::new(title, regions),
            updates,
            store,
        }
    }

    /// Run the application until the user quits or every sampler is gone
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_event_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            if self.state.drain(&mut self.updates) == StreamStatus::Closed {
                tracing::debug!("update stream closed");
                break;
            }
            self.state.resync_stale(&self.store);

            terminal.draw(|f| ui::render(f, &self.state))?;

            // Handle keyboard events (with timeout)
            if event::poll(Duration::from_millis(100))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && self.handle_key_event(key.code, key.modifiers)
            {
                break; // Quit
            }

            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn handle_key_event(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                return true;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return true;
            }
            KeyCode::Char(' ') => {
                self.state.toggle_pause();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.state.reload(&self.store);
            }
            _ => {}
        }

        false
    }
}
