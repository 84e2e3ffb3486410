//! Bounded command queue shared by every command producer.
//!
//! Producers (console reader thread, dashboard listeners, broker
//! subscriptions) call [`CommandInbox::submit`]; the scheduler loop takes
//! at most one line per pass.  The queue is a fixed-depth embassy channel
//! of fixed-capacity strings, so submission never allocates and a flood of
//! input is dropped instead of growing memory.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

/// Longest accepted command line, after trimming.
pub const MAX_COMMAND_LEN: usize = 128;
/// Lines that may wait for the loop.
pub const COMMAND_QUEUE_DEPTH: usize = 8;

pub type CommandLine = String<MAX_COMMAND_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxError {
    /// The line exceeds [`MAX_COMMAND_LEN`].
    TooLong,
    /// The queue already holds [`COMMAND_QUEUE_DEPTH`] lines.
    Full,
}

impl fmt::Display for InboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong => write!(f, "command line too long"),
            Self::Full => write!(f, "command queue full"),
        }
    }
}

pub struct CommandInbox {
    queue: Channel<CriticalSectionRawMutex, CommandLine, COMMAND_QUEUE_DEPTH>,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Queue one line.  Blank lines are accepted and ignored later by the
    /// parser.
    pub fn submit(&self, line: &str) -> Result<(), InboxError> {
        let mut buf = CommandLine::new();
        buf.push_str(line.trim()).map_err(|()| InboxError::TooLong)?;
        self.queue.try_send(buf).map_err(|_| InboxError::Full)
    }

    /// Oldest pending line, if any.
    pub fn take(&self) -> Option<CommandLine> {
        self.queue.try_receive().ok()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
