//! Wire protocol shared by the `kmo-batch` client and daemon.
//!
//! Every frame on the wire has a fixed width and there are no length
//! prefixes:
//!
//! | Direction | Frame | Width |
//! |---|---|---|
//! | client to daemon | command tag | 1 byte |
//! | client to daemon, after [`Command::NewJob`] | [`Job`] record | 8 bytes |
//! | daemon to client, on admission | [`Command::StartJob`] tag | 1 byte |
//!
//! The job record carries a single unsigned 64-bit memory requirement encoded
//! little-endian. Decoding is all-or-nothing: a stream that ends before a
//! frame is complete yields [`ProtocolError::Truncated`] rather than a partial
//! value, so callers can close the connection without mutating any state.

use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Width of an encoded command tag in bytes.
pub const COMMAND_WIDTH: usize = 1;

/// Width of an encoded [`Job`] record in bytes.
pub const JOB_WIDTH: usize = 8;

/// Commands exchanged between clients and the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Requests a textual snapshot of pending and running jobs.
    ListJobs = 0,
    /// Submits a job; followed by one [`Job`] record.
    NewJob = 1,
    /// Sent by the daemon when a submitted job is admitted.
    StartJob = 2,
}

impl Command {
    /// Returns the wire tag for the command.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Maps a wire tag back to a command.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::ListJobs),
            1 => Some(Self::NewJob),
            2 => Some(Self::StartJob),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListJobs => "LIST_JOBS",
            Self::NewJob => "NEW_JOB",
            Self::StartJob => "START_JOB",
        };
        formatter.write_str(name)
    }
}

/// Job descriptor submitted alongside [`Command::NewJob`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Job {
    memory: u64,
}

impl Job {
    /// Builds a job with the given memory requirement in bytes.
    #[must_use]
    pub const fn new(memory: u64) -> Self {
        Self { memory }
    }

    /// Memory requirement declared by the submitter.
    #[must_use]
    pub const fn memory(&self) -> u64 {
        self.memory
    }

    /// Encodes the record into its fixed-width wire form.
    #[must_use]
    #[expect(
        clippy::little_endian_bytes,
        reason = "the wire format fixes the byte order"
    )]
    pub const fn encode(&self) -> [u8; JOB_WIDTH] {
        self.memory.to_le_bytes()
    }

    /// Decodes a record from its fixed-width wire form.
    #[must_use]
    #[expect(
        clippy::little_endian_bytes,
        reason = "the wire format fixes the byte order"
    )]
    pub const fn decode(bytes: [u8; JOB_WIDTH]) -> Self {
        Self {
            memory: u64::from_le_bytes(bytes),
        }
    }
}

/// Frames that make up the protocol, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A one-byte command tag.
    Command,
    /// An eight-byte job record.
    Job,
}

impl fmt::Display for Frame {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => formatter.write_str("command tag"),
            Self::Job => formatter.write_str("job descriptor"),
        }
    }
}

/// Errors raised while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended before the frame was complete.
    #[error("truncated {frame}: received {received} of {expected} bytes")]
    Truncated {
        /// Frame being decoded.
        frame: Frame,
        /// Bytes the frame requires.
        expected: usize,
        /// Bytes received before end of stream.
        received: usize,
    },
    /// The command tag is not part of the protocol.
    #[error("unknown command tag {tag}")]
    UnknownCommand {
        /// Raw tag value received.
        tag: u8,
    },
    /// The underlying stream failed.
    #[error("failed to transfer {frame}: {source}")]
    Io {
        /// Frame being transferred.
        frame: Frame,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ProtocolError {
    /// Returns true when the peer closed the stream before sending anything.
    #[must_use]
    pub const fn is_empty_stream(&self) -> bool {
        matches!(self, Self::Truncated { received: 0, .. })
    }
}

/// Reads one command tag.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] on end of stream,
/// [`ProtocolError::UnknownCommand`] for tags outside the protocol and
/// [`ProtocolError::Io`] when the read fails.
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command, ProtocolError> {
    let [tag] = read_frame::<R, COMMAND_WIDTH>(reader, Frame::Command)?;
    Command::from_tag(tag).ok_or(ProtocolError::UnknownCommand { tag })
}

/// Reads one job record in full.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] when fewer than [`JOB_WIDTH`] bytes
/// arrive and [`ProtocolError::Io`] when the read fails.
pub fn read_job<R: Read>(reader: &mut R) -> Result<Job, ProtocolError> {
    read_frame::<R, JOB_WIDTH>(reader, Frame::Job).map(Job::decode)
}

/// Writes one command tag.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] when the tag cannot be written in full.
pub fn write_command<W: Write>(writer: &mut W, command: Command) -> Result<(), ProtocolError> {
    write_frame(writer, &[command.tag()], Frame::Command)
}

/// Writes one job record.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] when the record cannot be written in full.
pub fn write_job<W: Write>(writer: &mut W, job: &Job) -> Result<(), ProtocolError> {
    write_frame(writer, &job.encode(), Frame::Job)
}

/// Writes a job submission: the [`Command::NewJob`] tag followed by the record.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] when either frame cannot be written in full.
pub fn write_submission<W: Write>(writer: &mut W, job: &Job) -> Result<(), ProtocolError> {
    write_command(writer, Command::NewJob)?;
    write_job(writer, job)
}

fn read_frame<R: Read, const N: usize>(
    reader: &mut R,
    frame: Frame,
) -> Result<[u8; N], ProtocolError> {
    let mut buffer = [0_u8; N];
    let mut filled = 0;
    while let Some(remaining) = buffer.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match reader.read(remaining) {
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    frame,
                    expected: N,
                    received: filled,
                });
            }
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => return Err(ProtocolError::Io { frame, source }),
        }
    }
    Ok(buffer)
}

fn write_frame<W: Write>(writer: &mut W, bytes: &[u8], frame: Frame) -> Result<(), ProtocolError> {
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|source| ProtocolError::Io { frame, source })
}
