//! HTTP module source fetching.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// Trait for downloading a module source by canonical URL.
///
/// Abstracting over the transport keeps the resolver testable without a
/// network and leaves room for alternative backends (bundled registries,
/// on-disk fixtures).
pub trait ModuleFetcher: Send + Sync {
    /// Fetch the source text served at `url`.
    fn fetch_module(&self, url: &str) -> Result<String>;
}

/// `ureq`-backed fetcher used in production.
pub struct HttpModuleFetcher {
    agent: ureq::Agent,
}

impl HttpModuleFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("pure-sandbox/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpModuleFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}

impl ModuleFetcher for HttpModuleFetcher {
    fn fetch_module(&self, url: &str) -> Result<String> {
        debug!(url, "fetching module source");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(anyhow!("module server returned status {code} for {url}"));
            }
            Err(e) => {
                return Err(anyhow!(e)).with_context(|| format!("failed to fetch module {url}"));
            }
        };
        response
            .into_string()
            .with_context(|| format!("failed to read module body from {url}"))
    }
}
