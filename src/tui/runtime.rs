//! Event loop for the interactive dashboard.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEvent};
use tracing::info;

use super::input::{InputAction, map_key};
use super::render;
use super::terminal_guard::TerminalGuard;
use super::theme::{ColorMode, Theme};
use crate::core::errors::{Result, SquadError};
use crate::dashboard::DashboardController;

/// Input poll timeout; bounds key latency and notice pickup.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Environment name shown in the banner.
    pub environment: String,
    pub tick: Duration,
    pub color: ColorMode,
}

/// Loop state independent of the terminal.
pub struct DashboardRuntime<'a> {
    controller: &'a mut DashboardController,
    tick: Duration,
    last_tick: Option<Instant>,
    dirty: bool,
}

impl<'a> DashboardRuntime<'a> {
    pub fn new(controller: &'a mut DashboardController, tick: Duration) -> Self {
        Self {
            controller,
            tick,
            last_tick: None,
            dirty: true,
        }
    }

    /// Apply a key. Returns `false` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match map_key(key) {
            Some(InputAction::Quit) => false,
            Some(InputAction::Controller(action)) => {
                self.controller.apply(action);
                self.dirty = true;
                true
            }
            None => true,
        }
    }

    /// Run a controller tick when the cadence is due; the first call always ticks.
    pub fn maybe_tick(&mut self, now: Instant) -> bool {
        let due = self
            .last_tick
            .is_none_or(|last| now.saturating_duration_since(last) >= self.tick);
        if due {
            self.last_tick = Some(now);
            self.controller.tick(now);
            self.dirty = true;
        }
        due
    }

    /// Pick up finished background refreshes.
    pub fn absorb_notices(&mut self) {
        if !self.controller.drain_notices().is_empty() {
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a redraw is pending; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    #[must_use]
    pub fn controller(&self) -> &DashboardController {
        self.controller
    }
}

/// Run the dashboard until the user quits. The terminal is restored on every
/// exit path.
pub fn run(controller: &mut DashboardController, options: &DashboardOptions) -> Result<()> {
    let guard = TerminalGuard::new().map_err(|err| SquadError::io("terminal", err))?;
    let mut stdout = io::stdout();
    info!(environment = %options.environment, topic = %controller.selected(), "dashboard started");

    let result = run_inner(&mut stdout, controller, options)
        .map_err(|err| SquadError::io("terminal", err));

    drop(guard);
    info!("dashboard stopped");
    result
}

fn run_inner<W: Write>(
    out: &mut W,
    controller: &mut DashboardController,
    options: &DashboardOptions,
) -> io::Result<()> {
    let theme = Theme::new(options.color);
    let mut runtime = DashboardRuntime::new(controller, options.tick);

    loop {
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => {
                    if !runtime.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Resize(_, _) => runtime.mark_dirty(),
                _ => {}
            }
        }

        runtime.absorb_notices();
        runtime.maybe_tick(Instant::now());

        if runtime.take_dirty() {
            let (cols, rows) = TerminalGuard::terminal_size();
            let frame = runtime.controller().frame(Instant::now());
            let lines = render::layout(
                &frame,
                &options.environment,
                usize::from(cols),
                usize::from(rows),
            );
            render::draw(out, &lines, theme, rows)?;
        }
    }
}
