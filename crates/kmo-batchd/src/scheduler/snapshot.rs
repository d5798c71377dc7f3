//! Textual listing of pending and running jobs.

use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::client::Client;

/// One job as it appears in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotEntry {
    arrived_at: OffsetDateTime,
    admitted_at: Option<OffsetDateTime>,
    memory: u64,
}

impl SnapshotEntry {
    fn from_client<C>(client: &Client<C>) -> Self {
        Self {
            arrived_at: client.arrived_at(),
            admitted_at: client.admitted_at(),
            memory: client.job().memory(),
        }
    }

    /// Memory requirement declared by the submitter.
    #[must_use]
    pub const fn memory(&self) -> u64 {
        self.memory
    }
}

/// Point-in-time copy of the scheduler queues, rendered for `LIST_JOBS`.
///
/// The rendered form is plain text, one header per collection followed by
/// one indented line per job in arrival order:
///
/// ```text
/// Pending jobs:
///   added 2026-10-19T09:00:00Z memory 0
/// Running jobs:
///   added 2026-10-19T08:59:58Z started 2026-10-19T08:59:58Z memory 1024
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pending: Vec<SnapshotEntry>,
    running: Vec<SnapshotEntry>,
}

impl ListSnapshot {
    pub(crate) fn capture<'a, C: 'a>(
        pending: impl Iterator<Item = &'a Client<C>>,
        running: impl IntoIterator<Item = &'a Client<C>>,
    ) -> Self {
        Self {
            pending: pending.map(SnapshotEntry::from_client).collect(),
            running: running.into_iter().map(SnapshotEntry::from_client).collect(),
        }
    }

    /// Pending entries in arrival order.
    #[must_use]
    pub fn pending(&self) -> &[SnapshotEntry] {
        &self.pending
    }

    /// Running entries in arrival order.
    #[must_use]
    pub fn running(&self) -> &[SnapshotEntry] {
        &self.running
    }
}

impl fmt::Display for ListSnapshot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "Pending jobs:")?;
        for entry in &self.pending {
            writeln!(
                formatter,
                "  added {} memory {}",
                timestamp(entry.arrived_at),
                entry.memory
            )?;
        }
        writeln!(formatter, "Running jobs:")?;
        for entry in &self.running {
            let started = entry
                .admitted_at
                .map_or_else(|| "-".to_owned(), timestamp);
            writeln!(
                formatter,
                "  added {} started {started} memory {}",
                timestamp(entry.arrived_at),
                entry.memory
            )?;
        }
        Ok(())
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
