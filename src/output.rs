//! Message stream rendering for the CLI.

use std::io::Write;

use anyhow::Result;
use pure_sandbox_types::StampedMessage;

use crate::args::OutputFormat;

/// Write the collected message stream in the requested format.
pub fn write_messages(
    out: &mut impl Write,
    format: OutputFormat,
    messages: &[StampedMessage],
) -> Result<()> {
    match format {
        OutputFormat::Jsonl => {
            for message in messages {
                serde_json::to_writer(&mut *out, message)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, messages)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pure_sandbox_types::{ExecutionId, ExecutionMessage};

    fn sample() -> Vec<StampedMessage> {
        vec![StampedMessage {
            execution_id: ExecutionId(1),
            message: ExecutionMessage::Log {
                messages: vec![serde_json::json!(2)],
            },
        }]
    }

    #[test]
    fn test_jsonl_is_one_message_per_line() {
        let mut buf = Vec::new();
        write_messages(&mut buf, OutputFormat::Jsonl, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["type"], "log");
        assert_eq!(parsed["executionId"], 1);
    }

    #[test]
    fn test_json_is_an_array() {
        let mut buf = Vec::new();
        write_messages(&mut buf, OutputFormat::Json, &sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed[0]["type"], "log");
    }
}
