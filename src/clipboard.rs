// Best-effort clipboard. Copying never fails a command: implementations
// report whether the text landed and log the reason when it did not.

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::warn;

pub trait Clipboard {
    /// Returns true when the text was placed on the clipboard.
    fn copy(&self, text: &str) -> bool;
}

/// Used where no clipboard utility is known.
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn copy(&self, _text: &str) -> bool {
        false
    }
}

/// Pipes text into a platform clipboard utility (`pbcopy`, `clip`, `wl-copy`, `xclip`).
pub struct CommandClipboard {
    program: &'static str,
    args: &'static [&'static str],
}

impl CommandClipboard {
    pub fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        CommandClipboard { program, args }
    }

    fn pipe(&self, text: &str) -> std::io::Result<bool> {
        let mut child = Command::new(self.program)
            .args(self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // The child is always reaped, even when the write fails.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        Ok(status.success())
    }
}

impl Clipboard for CommandClipboard {
    fn copy(&self, text: &str) -> bool {
        match self.pipe(text) {
            Ok(true) => true,
            Ok(false) => {
                warn!(program = self.program, "clipboard utility exited with failure");
                false
            }
            Err(err) => {
                warn!(program = self.program, error = %err, "clipboard utility unavailable");
                false
            }
        }
    }
}

/// Pick the clipboard utility for this platform.
pub fn detect() -> Box<dyn Clipboard> {
    if cfg!(target_os = "macos") {
        Box::new(CommandClipboard::new("pbcopy", &[]))
    } else if cfg!(windows) {
        Box::new(CommandClipboard::new("clip", &[]))
    } else if cfg!(unix) {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Box::new(CommandClipboard::new("wl-copy", &[]))
        } else if std::env::var_os("DISPLAY").is_some() {
            Box::new(CommandClipboard::new("xclip", &["-selection", "clipboard"]))
        } else {
            Box::new(NoopClipboard)
        }
    } else {
        Box::new(NoopClipboard)
    }
}
