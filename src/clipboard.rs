use std::io::{self, Write};
use std::process::{Command, Stdio};

use log::{info, warn};

use crate::chat::Conversation;

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> io::Result<()>;
}

type CopyCommand = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const COPY_COMMANDS: &[CopyCommand] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const COPY_COMMANDS: &[CopyCommand] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const COPY_COMMANDS: &[CopyCommand] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Pipes text into the platform's copy utility, trying each in turn.
pub struct SystemClipboard {
    commands: &'static [CopyCommand],
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { commands: COPY_COMMANDS }
    }

    fn pipe_to(program: &str, args: &[&str], text: &str) -> io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        // Reap the child even when the write failed
        let status = child.wait()?;
        written?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", program, status),
            ))
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> io::Result<()> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no clipboard utility available");
        for (program, args) in self.commands {
            match Self::pipe_to(program, args, text) {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    NothingToCopy,
    Failed,
}

/// Copies the most recent bot reply. Failures are logged, never raised.
pub fn copy_last_reply(conversation: &Conversation, clipboard: &mut dyn Clipboard) -> CopyOutcome {
    let Some(reply) = conversation.last_reply() else {
        warn!("no reply to copy");
        return CopyOutcome::NothingToCopy;
    };

    match clipboard.set_text(reply.text()) {
        Ok(()) => {
            info!("copied reply ({} chars) to clipboard", reply.text().chars().count());
            CopyOutcome::Copied
        }
        Err(e) => {
            warn!("failed to copy to clipboard: {}", e);
            CopyOutcome::Failed
        }
    }
}
