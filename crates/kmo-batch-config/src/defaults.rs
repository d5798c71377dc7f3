use std::env;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use dirs::runtime_dir;
use libc::geteuid;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Concurrency ceiling applied when none is configured.
pub const DEFAULT_MAX_JOBS: NonZeroUsize = NonZeroUsize::MIN.saturating_add(3);

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Command read timeout applied when none is configured; zero disables it.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 0;

/// File name of the daemon socket inside the runtime directory.
pub const SOCKET_FILE_NAME: &str = "kmo-batchd.sock";

/// Owned default log filter, used as the `log_filter` field default.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the default socket endpoint for the daemon.
///
/// Prefers `$XDG_RUNTIME_DIR/kmo-batch`; without a runtime directory the
/// socket lives under the temporary directory, namespaced by effective uid so
/// users do not collide.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("kmo-batch");
    if apply_namespace {
        base.push(user_namespace());
    }

    SocketEndpoint::unix(base.join(SOCKET_FILE_NAME))
}

fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

fn user_namespace() -> String {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}
