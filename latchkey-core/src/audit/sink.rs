//! Destinations for audit records.

use std::io::Write;
use std::sync::Mutex;

use serde_json::Value;

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLevel {
    Security,
    Warn,
    Error,
}

impl RecordLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Errors go to the error channel, everything else to the informational one.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Error => Channel::Error,
            Self::Security | Self::Warn => Channel::Info,
        }
    }
}

/// Output channel of an audit record (stdout or stderr for [`StdioSink`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Info,
    Error,
}

/// A structured record ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub level: RecordLevel,
    pub body: Value,
    /// Render across multiple lines.
    pub pretty: bool,
}

impl AuditRecord {
    pub fn channel(&self) -> Channel {
        self.level.channel()
    }

    /// Render the record as JSON text.
    pub fn render(&self) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&self.body)
        } else {
            serde_json::to_string(&self.body)
        };
        rendered.unwrap_or_else(|_| format!(r#"{{"level":"{}"}}"#, self.level.as_str()))
    }
}

/// Where audit records are written.
///
/// Implementations must not panic; a returned error is reported through
/// `tracing` and otherwise ignored.
pub trait AuditSink: Send + Sync + 'static {
    fn write(&self, record: &AuditRecord) -> std::io::Result<()>;
}

/// Writes one JSON document per record to stdout or stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl AuditSink for StdioSink {
    fn write(&self, record: &AuditRecord) -> std::io::Result<()> {
        let line = record.render();
        match record.channel() {
            Channel::Info => writeln!(std::io::stdout().lock(), "{line}"),
            Channel::Error => writeln!(std::io::stderr().lock(), "{line}"),
        }
    }
}

/// Forwards records to `tracing` under the `latchkey::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn write(&self, record: &AuditRecord) -> std::io::Result<()> {
        let line = record.render();
        match record.level {
            RecordLevel::Security => tracing::info!(target: "latchkey::audit", "{line}"),
            RecordLevel::Warn => tracing::warn!(target: "latchkey::audit", "{line}"),
            RecordLevel::Error => tracing::error!(target: "latchkey::audit", "{line}"),
        }
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Record bodies in write order.
    pub fn bodies(&self) -> Vec<Value> {
        self.records().into_iter().map(|r| r.body).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl AuditSink for MemorySink {
    fn write(&self, record: &AuditRecord) -> std::io::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}
