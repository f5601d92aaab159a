//! Per-run structured logger.
//!
//! One logger instance exists per run, bound to that run's execution id at
//! construction and threaded explicitly through every realm binding. `send`
//! stamps the message and transmits it across the isolation boundary; a
//! transmission failure is caught and replaced with a synthesized
//! diagnostic, so a logging failure is never silent.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use pure_sandbox_types::{ExecutionId, ExecutionMessage, StampedMessage};

use crate::errors::RunError;

#[derive(Clone)]
pub struct PureLogger {
    execution_id: ExecutionId,
    tx: UnboundedSender<StampedMessage>,
}

impl PureLogger {
    pub fn new(execution_id: ExecutionId, tx: UnboundedSender<StampedMessage>) -> Self {
        Self { execution_id, tx }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Stamp and transmit a message. On transmission failure a synthesized
    /// error diagnostic is sent in its place.
    pub fn send(&self, message: ExecutionMessage) {
        if let Err(failed) = self.transmit(message) {
            warn!(
                execution_id = self.execution_id.as_u64(),
                "failed to transmit message: {failed:?}"
            );
            let _ = self.transmit(ExecutionMessage::Error {
                messages: vec![Value::String(
                    "PureLoggerError: a message could not be delivered to the consumer"
                        .to_string(),
                )],
                stack: None,
            });
        }
    }

    fn transmit(&self, message: ExecutionMessage) -> Result<(), ExecutionMessage> {
        self.tx
            .send(StampedMessage {
                execution_id: self.execution_id,
                message,
            })
            .map_err(|e| e.0.message)
    }

    pub fn log(&self, messages: Vec<Value>) {
        self.send(ExecutionMessage::Log { messages });
    }

    pub fn warn(&self, messages: Vec<Value>) {
        self.send(ExecutionMessage::Warn { messages });
    }

    pub fn error(&self, messages: Vec<Value>, stack: Option<String>) {
        self.send(ExecutionMessage::Error { messages, stack });
    }

    /// Report a failed run. The ignorable tag is checked here, once: a
    /// not-ready module signal is expected control flow and is swallowed.
    pub fn report(&self, err: &RunError) {
        if !err.is_reportable() {
            debug!(
                execution_id = self.execution_id.as_u64(),
                "suppressing not-ready signal: {err}"
            );
            return;
        }
        match err {
            RunError::Evaluation { message, stack } => {
                self.error(vec![Value::String(message.clone())], stack.clone());
            }
            RunError::NotReady { .. } => unreachable!("not reportable"),
        }
    }
}
