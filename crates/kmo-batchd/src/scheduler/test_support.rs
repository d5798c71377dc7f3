//! Doubles for exercising the scheduler without an event loop.

use std::collections::HashSet;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use super::watch::WatchSet;

/// Daemon end of a socket pair whose writes can be made to fail.
#[derive(Debug)]
pub(crate) struct ScriptedConnection {
    stream: UnixStream,
    refuse_writes: bool,
}

impl ScriptedConnection {
    /// Makes every subsequent write fail with a broken pipe.
    pub(crate) fn refusing_writes(mut self) -> Self {
        self.refuse_writes = true;
        self
    }
}

impl Write for ScriptedConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.refuse_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl AsFd for ScriptedConnection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

/// Returns a scheduler-side connection and the submitter's end of it.
pub(crate) fn connected_pair() -> (ScriptedConnection, UnixStream) {
    let (daemon, client) = UnixStream::pair().expect("socket pair");
    (
        ScriptedConnection {
            stream: daemon,
            refuse_writes: false,
        },
        client,
    )
}

/// Reads the start byte from a submitter's end, if one arrives promptly.
pub(crate) fn read_start_signal(peer: &mut UnixStream) -> Option<u8> {
    peer.set_read_timeout(Some(Duration::from_millis(100)))
        .expect("set read timeout");
    let mut buffer = [0_u8; 1];
    match peer.read(&mut buffer) {
        Ok(1) => Some(buffer[0]),
        _ => None,
    }
}

/// Watch set that records membership in memory.
#[derive(Debug, Default)]
pub(crate) struct RecordingWatchSet {
    watched: HashSet<RawFd>,
    fail_next: bool,
}

impl RecordingWatchSet {
    /// Makes the next `watch` call fail.
    pub(crate) fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub(crate) fn contains(&self, descriptor: RawFd) -> bool {
        self.watched.contains(&descriptor)
    }

    pub(crate) fn len(&self) -> usize {
        self.watched.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }
}

impl WatchSet for RecordingWatchSet {
    fn watch(&mut self, descriptor: BorrowedFd<'_>) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(io::Error::from(io::ErrorKind::OutOfMemory));
        }
        self.watched.insert(descriptor.as_raw_fd());
        Ok(())
    }

    fn unwatch(&mut self, descriptor: BorrowedFd<'_>) {
        self.watched.remove(&descriptor.as_raw_fd());
    }
}
