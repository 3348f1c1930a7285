use anyhow::{Context, Result};
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

/// Scoped raw-mode handle for the controlling terminal.
///
/// Entering clears canonical mode (so keystrokes are delivered one at a time,
/// before any newline) and terminal echo (so the reader controls what appears
/// on screen). Dropping the guard restores the saved attributes, on every
/// exit path.
pub struct RawModeGuard {
    saved: Termios,
}

impl RawModeGuard {
    pub fn enter() -> Result<Self> {
        let stdin = std::io::stdin();
        let saved = termios::tcgetattr(&stdin).context("reading terminal attributes")?;

        let mut raw = saved.clone();
        raw.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw)
            .context("entering raw terminal mode")?;

        Ok(Self { saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Nothing useful can be done about a restore failure at this point.
        let _ = termios::tcsetattr(&std::io::stdin(), SetArg::TCSANOW, &self.saved);
    }
}
