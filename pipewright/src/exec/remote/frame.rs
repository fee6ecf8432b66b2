//! Channel framing and the terminal status payload.

use serde::{Deserialize, Serialize};

/// One decoded frame of an exec channel.
///
/// The first byte of a raw frame selects the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFrame<'a> {
    /// Stream 1.
    Stdout(&'a [u8]),
    /// Stream 2.
    Stderr(&'a [u8]),
    /// Stream 3, carrying the terminal status payload.
    Status(&'a [u8]),
    /// Any other stream (stdin echo, resize).
    Other(u8),
}

impl<'a> ChannelFrame<'a> {
    /// Stream id of standard output.
    pub const STDOUT: u8 = 1;
    /// Stream id of standard error.
    pub const STDERR: u8 = 2;
    /// Stream id of the status side channel.
    pub const STATUS: u8 = 3;

    /// Decodes a raw frame; empty frames yield `None`.
    #[must_use]
    pub fn decode(raw: &'a [u8]) -> Option<Self> {
        let (&stream, payload) = raw.split_first()?;
        Some(match stream {
            Self::STDOUT => Self::Stdout(payload),
            Self::STDERR => Self::Stderr(payload),
            Self::STATUS => Self::Status(payload),
            other => Self::Other(other),
        })
    }

    /// Encodes a payload for a stream.
    #[must_use]
    pub fn encode(stream: u8, payload: &[u8]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(payload.len() + 1);
        raw.push(stream);
        raw.extend_from_slice(payload);
        raw
    }
}

/// Terminal status reported on the side channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStatus {
    /// `Success` or `Failure`.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable reason, e.g. `NonZeroExitCode`.
    #[serde(default)]
    pub reason: Option<String>,
    /// Structured causes.
    #[serde(default)]
    pub details: Option<StatusDetails>,
}

/// Details of a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Causes, in reported order.
    #[serde(default)]
    pub causes: Vec<StatusCause>,
}

/// One cause of a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCause {
    /// Cause reason, `ExitCode` for the exit status.
    #[serde(default)]
    pub reason: Option<String>,
    /// Cause message, the numeric code for `ExitCode`.
    #[serde(default)]
    pub message: Option<String>,
}

impl ExecStatus {
    /// Parses a raw status payload.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Maps the status to an exit code.
    ///
    /// `Success` is 0. Otherwise the first `ExitCode` cause decides; when
    /// there is none, or its message is not a number, the code is 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.status.as_deref() == Some("Success") {
            return 0;
        }
        self.details
            .iter()
            .flat_map(|details| details.causes.iter())
            .find(|cause| cause.reason.as_deref() == Some("ExitCode"))
            .and_then(|cause| cause.message.as_deref()?.trim().parse::<i32>().ok())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frames() {
        assert_eq!(ChannelFrame::decode(b"\x01hi"), Some(ChannelFrame::Stdout(b"hi")));
        assert_eq!(ChannelFrame::decode(b"\x02err"), Some(ChannelFrame::Stderr(b"err")));
        assert_eq!(ChannelFrame::decode(b"\x03{}"), Some(ChannelFrame::Status(b"{}")));
        assert_eq!(ChannelFrame::decode(b"\x04x"), Some(ChannelFrame::Other(4)));
        assert_eq!(ChannelFrame::decode(b""), None);
        assert_eq!(ChannelFrame::encode(ChannelFrame::STDOUT, b"hi"), b"\x01hi".to_vec());
    }

    #[test]
    fn test_success_status() {
        let status = ExecStatus::parse(r#"{"metadata":{},"status":"Success"}"#).unwrap();
        assert_eq!(status.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_cause() {
        let status = ExecStatus::parse(
            r#"{"status":"Failure","reason":"NonZeroExitCode","details":{"causes":[{"reason":"Other","message":"7"},{"reason":"ExitCode","message":"128"}]}}"#,
        )
        .unwrap();
        assert_eq!(status.exit_code(), 128);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let unparsable = ExecStatus::parse(
            r#"{"status":"Failure","details":{"causes":[{"reason":"ExitCode","message":"abc"}]}}"#,
        )
        .unwrap();
        assert_eq!(unparsable.exit_code(), 1);

        let first_unparsable = ExecStatus::parse(
            r#"{"status":"Failure","details":{"causes":[{"reason":"ExitCode","message":"abc"},{"reason":"ExitCode","message":"7"}]}}"#,
        )
        .unwrap();
        assert_eq!(first_unparsable.exit_code(), 1);

        let no_causes = ExecStatus::parse(r#"{"status":"Failure"}"#).unwrap();
        assert_eq!(no_causes.exit_code(), 1);
    }
}
