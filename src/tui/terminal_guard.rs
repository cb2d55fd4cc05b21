//! RAII terminal lifecycle guard.
//!
//! [`TerminalGuard`] enters raw mode and the alternate screen on construction,
//! and restores the terminal on [`Drop`], including on early error returns. A
//! panic hook restores the terminal before the panic message is printed so
//! the message lands on a normal screen.

use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};

/// Set while raw mode is active; checked by the panic hook.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

pub struct TerminalGuard {
    hook_installed: bool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, installing a cleanup hook.
    ///
    /// # Errors
    /// Returns I/O errors if terminal setup fails. Whatever was already set
    /// up is undone before returning.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            restore_terminal_best_effort();
            return Err(err);
        }

        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal_best_effort();
            prev(info);
        }));

        Ok(Self {
            hook_installed: true,
        })
    }

    /// Terminal dimensions (columns, rows), falling back to 80x24.
    #[must_use]
    pub fn terminal_size() -> (u16, u16) {
        terminal::size()
            .ok()
            .filter(|(cols, rows)| *cols > 0 && *rows > 0)
            .unwrap_or((80, 24))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal_best_effort();
        if self.hook_installed {
            // The previous hook moved into our closure; fall back to the default.
            let _ = panic::take_hook();
        }
    }
}

/// Leave the alternate screen and raw mode. Safe to call repeatedly.
fn restore_terminal_best_effort() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_is_idempotent_and_clears_flag() {
        restore_terminal_best_effort();
        restore_terminal_best_effort();
        assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));
    }

    #[test]
    fn terminal_size_is_never_zero() {
        let (cols, rows) = TerminalGuard::terminal_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }
}
