use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

/// Owns the terminal modes the overlay needs: raw input, the alternate
/// screen, mouse reporting for dragging, and focus reporting for the
/// flush-on-blur wiring. Holding a guard is proof that setup ran, and the
/// session must call [TtyGuard::restore] on its way out.
pub struct TtyGuard;

impl TtyGuard {
    pub fn install() -> Result<(Self, Terminal<CrosstermBackend<Stdout>>)> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange
        )
        .context("enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")?;
        Ok((TtyGuard, terminal))
    }

    /// Hands the terminal back to the shell and stops the process, the
    /// terminal equivalent of the page going hidden. Execution continues
    /// inside this call once somebody sends SIGCONT.
    pub fn suspend(&self) -> Result<()> {
        execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableFocusChange
        )?;
        disable_raw_mode()?;

        #[cfg(unix)]
        unsafe {
            libc::raise(libc::SIGSTOP);
        }

        Ok(())
    }

    /// Re-enters the modes [TtyGuard::suspend] dropped. The caller still has
    /// to repaint, the old screen content is gone.
    pub fn resume(&self) -> Result<()> {
        enable_raw_mode().context("re-enable raw mode")?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange
        )
        .context("re-enter alternate screen")?;
        Ok(())
    }

    /// Final teardown. Leaves the shell exactly as the session found it.
    pub fn restore(&self) -> Result<()> {
        execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableFocusChange
        )?;
        disable_raw_mode()?;
        Ok(())
    }
}
