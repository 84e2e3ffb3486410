//! Text command vocabulary.
//!
//! Lines arrive from the console and dashboard listeners through the
//! [`CommandInbox`](super::inbox::CommandInbox).  Parsing is total: any
//! input yields a command, nothing (blank line), or a typed error that the
//! interpreter turns into a reply.  Verbs match case-insensitively and
//! surrounding whitespace is ignored.

use heapless::String;

use crate::error::{CommandError, echo};

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enable every initialized sink and start sampling.
    StartAll,
    /// Disable every sink and stop sampling.
    StopAll,
    Status,
    Help,
    /// Zero the measurement counter.
    ResetCount,
    /// Flip the file log sink on or off.
    ToggleFileLog,
    /// Close the current log artifact.
    RotateFile,
    /// Change the sampling interval (milliseconds).
    SetRate(u32),
    /// Erase stored network credentials.
    ForgetNetwork,
    /// Persist network credentials; an empty password means an open network.
    SetNetwork {
        ssid: String<MAX_SSID_LEN>,
        password: String<MAX_PASSWORD_LEN>,
    },
}

/// Verb table for the help reply, in display order.
pub const HELP: &[(&str, &str)] = &[
    ("start_all", "Enable all initialized sinks and start sampling"),
    ("stop_all", "Disable all sinks and stop sampling"),
    ("status", "Show system status"),
    ("help", "Show this help"),
    ("reset_count", "Reset the measurement counter"),
    ("toggle_sd", "Toggle file logging"),
    ("rotate_file", "Close the current log file and start a new one"),
    ("set_rate <ms>", "Set the sampling interval in milliseconds"),
    ("set_wifi <ssid> [password]", "Store network credentials; applied on restart"),
    ("forget_wifi", "Erase stored network credentials (alias: clear_wifi)"),
];

/// Credential token: printable ASCII without spaces, at most `N` bytes.
fn credential<const N: usize>(token: &str) -> Option<String<N>> {
    if !token.bytes().all(|b| b.is_ascii_graphic()) {
        return None;
    }
    String::try_from(token).ok()
}

impl Command {
    /// Parse one line.  `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let extra = words.next();

        let is = |name: &str| verb.eq_ignore_ascii_case(name);

        if is("set_rate") {
            return match (arg, extra) {
                (Some(ms), None) => ms
                    .parse::<u32>()
                    .map(|ms| Some(Self::SetRate(ms)))
                    .map_err(|_| CommandError::InvalidArgument(echo(ms))),
                _ => Err(CommandError::Usage("set_rate <ms>")),
            };
        }

        if is("set_wifi") {
            return match (arg, extra, words.next()) {
                (Some(ssid), password, None) => {
                    let ssid = credential(ssid)
                        .ok_or_else(|| CommandError::InvalidArgument(echo(ssid)))?;
                    let password = credential(password.unwrap_or(""))
                        .ok_or_else(|| CommandError::InvalidArgument(echo("<password>")))?;
                    Ok(Some(Self::SetNetwork { ssid, password }))
                }
                _ => Err(CommandError::Usage("set_wifi <ssid> [password]")),
            };
        }

        let cmd = if is("start_all") {
            Self::StartAll
        } else if is("stop_all") {
            Self::StopAll
        } else if is("status") {
            Self::Status
        } else if is("help") {
            Self::Help
        } else if is("reset_count") {
            Self::ResetCount
        } else if is("toggle_sd") {
            Self::ToggleFileLog
        } else if is("rotate_file") {
            Self::RotateFile
        } else if is("forget_wifi") || is("clear_wifi") {
            Self::ForgetNetwork
        } else {
            return Err(CommandError::Unknown(echo(verb)));
        };

        if arg.is_some() {
            return Err(CommandError::Usage(cmd.usage()));
        }
        Ok(Some(cmd))
    }

    fn usage(&self) -> &'static str {
        match self {
            Self::StartAll => "start_all",
            Self::StopAll => "stop_all",
            Self::Status => "status",
            Self::Help => "help",
            Self::ResetCount => "reset_count",
            Self::ToggleFileLog => "toggle_sd",
            Self::RotateFile => "rotate_file",
            Self::SetRate(_) => "set_rate <ms>",
            Self::ForgetNetwork => "forget_wifi",
            Self::SetNetwork { .. } => "set_wifi <ssid> [password]",
        }
    }
}
