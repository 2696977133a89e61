//! Audit sink interface for operation, error, and checkpoint events
//!
//! The pipeline emits exactly one event per fetch attempt, per node
//! failure, and per persistence batch. How events are stored or displayed
//! is the sink's concern; the default sink forwards them to `tracing`.

use crate::model::{Ancestry, Level};
use std::sync::Mutex;
use std::time::Duration;

/// Context attached to every audit event
///
/// Carries the full ancestry of the node that produced the event so a
/// failure can be located without correlating log lines.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub level: Option<Level>,
    pub url: Option<String>,
    pub ancestry: Ancestry,
}

impl AuditContext {
    pub fn new(level: Level, url: &str) -> Self {
        Self {
            level: Some(level),
            url: Some(url.to_string()),
            ancestry: Ancestry::default(),
        }
    }

    pub fn with_ancestry(mut self, ancestry: &Ancestry) -> Self {
        self.ancestry = ancestry.clone();
        self
    }

    fn level_str(&self) -> &str {
        self.level.map(|l| l.as_str()).unwrap_or("-")
    }
}

/// Receiver for structured pipeline events
pub trait AuditSink: Send + Sync {
    /// A timed operation completed (successfully or not)
    fn operation(&self, name: &str, ctx: &AuditContext, duration: Duration, status: &str);

    /// A recovered error occurred at a node or batch boundary
    fn error(&self, name: &str, ctx: &AuditContext, kind: &str, message: &str);

    /// A traversal milestone was reached
    fn checkpoint(&self, name: &str, ctx: &AuditContext);
}

/// Default sink that forwards events to `tracing`
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn operation(&self, name: &str, ctx: &AuditContext, duration: Duration, status: &str) {
        tracing::debug!(
            operation = name,
            level = ctx.level_str(),
            path = %ctx.ancestry.path(),
            url = ctx.url.as_deref().unwrap_or("-"),
            duration_ms = duration.as_millis() as u64,
            status,
            "operation"
        );
    }

    fn error(&self, name: &str, ctx: &AuditContext, kind: &str, message: &str) {
        tracing::warn!(
            operation = name,
            level = ctx.level_str(),
            path = %ctx.ancestry.path(),
            url = ctx.url.as_deref().unwrap_or("-"),
            kind,
            message,
            "pipeline error"
        );
    }

    fn checkpoint(&self, name: &str, ctx: &AuditContext) {
        tracing::info!(
            checkpoint = name,
            level = ctx.level_str(),
            path = %ctx.ancestry.path(),
            "checkpoint"
        );
    }
}

/// One captured audit event
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    Operation {
        name: String,
        level: Option<Level>,
        status: String,
    },
    Error {
        name: String,
        level: Option<Level>,
        kind: String,
        path: String,
    },
    Checkpoint {
        name: String,
        level: Option<Level>,
    },
}

/// Sink that records events in memory, used by tests
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_operations(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, AuditEvent::Operation { name: n, .. } if n == name))
            .count()
    }

    pub fn count_errors(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, AuditEvent::Error { name: n, .. } if n == name))
            .count()
    }
}

impl AuditSink for RecordingSink {
    fn operation(&self, name: &str, ctx: &AuditContext, _duration: Duration, status: &str) {
        self.events.lock().unwrap().push(AuditEvent::Operation {
            name: name.to_string(),
            level: ctx.level,
            status: status.to_string(),
        });
    }

    fn error(&self, name: &str, ctx: &AuditContext, kind: &str, _message: &str) {
        self.events.lock().unwrap().push(AuditEvent::Error {
            name: name.to_string(),
            level: ctx.level,
            kind: kind.to_string(),
            path: ctx.ancestry.path(),
        });
    }

    fn checkpoint(&self, name: &str, ctx: &AuditContext) {
        self.events.lock().unwrap().push(AuditEvent::Checkpoint {
            name: name.to_string(),
            level: ctx.level,
        });
    }
}
