//! Runs the event loop on a background thread against a temporary socket.

use std::io::{ErrorKind, Read};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kmo_batch_protocol::{Command, Job, write_command, write_submission};

use crate::event_loop::{EventLoop, EventLoopError};
use crate::transport::SocketListener;

use super::config_loader::TestConfigLoader;

const LOOP_INTERVAL: Duration = Duration::from_millis(20);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Event loop serving a temporary socket until dropped.
pub struct RunningDaemon {
    loader: TestConfigLoader,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), EventLoopError>>>,
}

impl RunningDaemon {
    /// Binds a fresh socket and starts serving it with `max_jobs` slots.
    #[must_use]
    pub fn start(max_jobs: usize) -> Self {
        let loader = TestConfigLoader::new().with_max_jobs(max_jobs);
        let config = loader.config();
        let shutdown = Arc::new(AtomicBool::new(false));
        let loop_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let listener = SocketListener::bind(config.daemon_socket()).expect("bind socket");
            let event_loop = EventLoop::new(listener, &config, loop_shutdown)
                .expect("create event loop")
                .with_poll_interval(LOOP_INTERVAL);
            ready_tx.send(()).expect("report readiness");
            event_loop.run()
        });
        ready_rx
            .recv_timeout(STARTUP_TIMEOUT)
            .expect("event loop should start");
        Self {
            loader,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Socket file the daemon is bound to.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.loader.socket_path()
    }

    /// Opens a connection and submits a job, returning the held connection.
    #[must_use]
    pub fn submit(&self, memory: u64) -> UnixStream {
        let mut stream = self.connect();
        write_submission(&mut stream, &Job::new(memory)).expect("send submission");
        stream
    }

    /// Opens a raw connection.
    #[must_use]
    pub fn connect(&self) -> UnixStream {
        UnixStream::connect(self.socket_path()).expect("connect to daemon")
    }

    /// Requests a listing and returns the daemon's reply.
    #[must_use]
    pub fn list(&self) -> Listing {
        let mut stream = self.connect();
        write_command(&mut stream, Command::ListJobs).expect("send list request");
        let mut text = String::new();
        stream.read_to_string(&mut text).expect("read listing");
        Listing::parse(text)
    }

    /// Polls the listing until it reports the given counts or times out.
    #[must_use]
    pub fn await_listing(&self, running: usize, pending: usize) -> Listing {
        self.await_listing_where(|listing| {
            listing.running() == running && listing.pending() == pending
        })
    }

    /// Polls the listing until `accept` holds or times out, returning the last reply.
    #[must_use]
    pub fn await_listing_where(&self, accept: impl Fn(&Listing) -> bool) -> Listing {
        let deadline = Instant::now() + STARTUP_TIMEOUT;
        loop {
            let listing = self.list();
            if accept(&listing) || Instant::now() >= deadline {
                return listing;
            }
            thread::sleep(LOOP_INTERVAL);
        }
    }

    /// Requests shutdown and waits for the loop to return.
    pub fn stop(&mut self) -> Option<Result<(), EventLoopError>> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.handle
            .take()
            .map(|handle| handle.join().expect("event loop thread panicked"))
    }
}

impl Drop for RunningDaemon {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

/// Entries parsed from a listing reply, as declared memory in listed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub text: String,
    pub pending_memory: Vec<u64>,
    pub running_memory: Vec<u64>,
}

impl Listing {
    fn parse(text: String) -> Self {
        let mut pending_memory = Vec::new();
        let mut running_memory = Vec::new();
        let mut in_running = false;
        for line in text.lines() {
            match line {
                "Pending jobs:" => in_running = false,
                "Running jobs:" => in_running = true,
                entry if entry.starts_with("  added ") => {
                    let memory = entry
                        .rsplit_once(" memory ")
                        .and_then(|(_, value)| value.parse().ok())
                        .expect("listing entry ends with its memory");
                    if in_running {
                        running_memory.push(memory);
                    } else {
                        pending_memory.push(memory);
                    }
                }
                _ => {}
            }
        }
        Self {
            text,
            pending_memory,
            running_memory,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending_memory.len()
    }

    pub fn running(&self) -> usize {
        self.running_memory.len()
    }
}

/// Waits up to `within` for the start byte on a held connection.
pub fn await_start(stream: &mut UnixStream, within: Duration) -> bool {
    stream
        .set_read_timeout(Some(within))
        .expect("set read timeout");
    let mut byte = [0_u8; 1];
    match stream.read(&mut byte) {
        Ok(1) => byte[0] == Command::StartJob.tag(),
        Ok(_) => false,
        Err(error) if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => false,
        Err(error) => panic!("reading start signal failed: {error}"),
    }
}
