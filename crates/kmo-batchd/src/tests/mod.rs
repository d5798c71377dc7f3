//! Test suites for the batch admission daemon.

mod support;
mod unit;
