//! Pure Sandbox Transport Layer
//!
//! Network transport for remote module loading.
//!
//! This crate provides:
//! - [`fetcher`]: HTTP client for downloading module sources from a CDN
//! - [`cdn`]: canonical module URL construction
//! - [`rate_limit`]: ordered, rate-limited release of outbound requests
//!
//! # Example
//!
//! ```ignore
//! use pure_transport::{cdn, HttpModuleFetcher, ModuleFetcher};
//! use pure_sandbox_types::parse_module_specifier;
//!
//! let spec = parse_module_specifier("lodash@4.17.21").unwrap();
//! let url = cdn::module_url(&spec, cdn::DEFAULT_CDN_BASE);
//! let fetcher = HttpModuleFetcher::default();
//! let source = fetcher.fetch_module(&url)?;
//! ```

pub mod cdn;
pub mod fetcher;
pub mod rate_limit;

pub use cdn::{module_url, DEFAULT_CDN_BASE};
pub use fetcher::{HttpModuleFetcher, ModuleFetcher};
pub use rate_limit::RequestQueue;
