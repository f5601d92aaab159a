//! End-to-end tests for the compile-sandbox-run pipeline.
//!
//! Test scenarios live under `tests/`; this crate exists so they compile
//! against the workspace members without inflating the CLI package.
