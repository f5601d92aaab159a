//! Mock query layer.
//!
//! Wraps a [`QueryDriver`] so query building and connection lifecycle work
//! without a live database. Only query execution is intercepted: the
//! compiled SQL and bound parameters are hashed, reported as an `sql`
//! message, and replayed from the recorded rows when a recording exists;
//! otherwise execution delegates to the underlying driver.

use std::collections::HashMap;

use anyhow::Result;

use pure_sandbox_types::{hash_canonical, CompiledQuery, ContentHash, QueryRows, RecordedRows};

use crate::logger::PureLogger;

/// Database driver seam. The no-op implementation supports compilation and
/// introspection flows without performing any real I/O.
pub trait QueryDriver: Send + Sync {
    fn acquire(&self) -> Result<()> {
        Ok(())
    }
    fn release(&self) -> Result<()> {
        Ok(())
    }
    fn begin(&self) -> Result<()> {
        Ok(())
    }
    fn commit(&self) -> Result<()> {
        Ok(())
    }
    fn rollback(&self) -> Result<()> {
        Ok(())
    }
    fn execute(&self, query: &CompiledQuery) -> Result<QueryRows>;
}

/// Driver that never touches a database; every query yields an empty
/// result set.
#[derive(Debug, Default)]
pub struct NoopDriver;

impl QueryDriver for NoopDriver {
    fn execute(&self, _query: &CompiledQuery) -> Result<QueryRows> {
        Ok(QueryRows::default())
    }
}

pub struct MockQueryLayer {
    driver: Box<dyn QueryDriver>,
    mocks: HashMap<ContentHash, RecordedRows>,
    logger: PureLogger,
}

impl MockQueryLayer {
    pub fn new(
        driver: Box<dyn QueryDriver>,
        mocks: HashMap<ContentHash, RecordedRows>,
        logger: PureLogger,
    ) -> Self {
        Self {
            driver,
            mocks,
            logger,
        }
    }

    /// Hash, report, then replay or delegate.
    pub fn execute(&self, query: CompiledQuery) -> Result<QueryRows> {
        let hash = hash_canonical(&serde_json::to_value(&query)?);
        self.logger.send(pure_sandbox_types::ExecutionMessage::Sql {
            compiled: query.clone(),
            hash: hash.clone(),
        });

        if let Some(recorded) = self.mocks.get(&hash) {
            return Ok(QueryRows {
                rows: recorded.rows.clone(),
            });
        }
        self.driver.execute(&query)
    }

    // Connection lifecycle passes through unmodified.
    pub fn acquire(&self) -> Result<()> {
        self.driver.acquire()
    }
    pub fn release(&self) -> Result<()> {
        self.driver.release()
    }
    pub fn begin(&self) -> Result<()> {
        self.driver.begin()
    }
    pub fn commit(&self) -> Result<()> {
        self.driver.commit()
    }
    pub fn rollback(&self) -> Result<()> {
        self.driver.rollback()
    }
}
