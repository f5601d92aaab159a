//! pure-sandbox CLI
//!
//! Runs TypeScript snippets through the compile-sandbox-run pipeline in
//! [`pure_sandbox_core`] and prints the stamped message stream. Network
//! and database access never leave the process; both are replayed from
//! recorded mocks keyed by canonical content hashes.

pub mod args;
pub mod output;
