//! Socket listener for the daemon endpoint.
//!
//! The transport module binds the configured Unix socket, recovering from a
//! stale socket file left by a previous run, and hands accepted connections to
//! the event loop one at a time.

mod errors;
mod listener;

pub use self::errors::ListenerError;
pub use self::listener::SocketListener;

const LISTENER_TARGET: &str = "kmo_batchd::transport";
