use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Unix domain socket the daemon listens on and clients connect to.
///
/// Endpoints are written as `unix:///absolute/path` URLs. A bare absolute
/// path is accepted as shorthand when parsing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SocketEndpoint {
    path: Utf8PathBuf,
}

impl SocketEndpoint {
    /// Builds an endpoint for the given socket path.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Filesystem path of the socket.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
        else {
            return Err(SocketPreparationError::MissingParent {
                path: self.path.clone(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unix://{}", self.path)
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.starts_with('/') {
            return Ok(Self::unix(input));
        }

        let url = Url::parse(input)?;
        if url.scheme() != "unix" {
            return Err(SocketParseError::UnsupportedScheme(url.scheme().to_owned()));
        }
        if url.host_str().is_some_and(|host| !host.is_empty()) {
            return Err(SocketParseError::UnexpectedHost(input.to_owned()));
        }
        let path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|_| SocketParseError::InvalidPath(input.to_owned()))?;
        if path.is_empty() || path == "/" {
            return Err(SocketParseError::MissingUnixPath(input.to_owned()));
        }
        Ok(Self::unix(path.into_owned()))
    }
}

impl TryFrom<String> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketEndpoint> for String {
    fn from(endpoint: SocketEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`SocketEndpoint`] from text.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Scheme was not `unix`.
    #[error("unsupported socket scheme '{0}'; expected unix://")]
    UnsupportedScheme(String),
    /// A host component was supplied where only a path is meaningful.
    #[error("unix socket address '{0}' must not name a host")]
    UnexpectedHost(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// The decoded path was not valid UTF-8.
    #[error("socket path in '{0}' is not valid UTF-8")]
    InvalidPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
