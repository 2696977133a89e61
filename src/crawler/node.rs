//! Crawl node working state
//!
//! A node is one page to fetch and extract at a given level. Nodes are
//! created by the orchestrator when a parent-level record yields a child
//! URL, consumed once, and never persisted.

use crate::model::{Ancestry, Level};

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlNode {
    pub level: Level,
    pub url: String,
    /// Ancestor keys of the page, used for extraction context and audit
    pub ancestry: Ancestry,
}

impl CrawlNode {
    pub fn new(level: Level, url: String, ancestry: Ancestry) -> Self {
        Self {
            level,
            url,
            ancestry,
        }
    }
}

/// Lifecycle of a node within its task
///
/// `Pending → Fetching → Extracted → {PersistQueued, Failed}`. The state
/// is local to the task processing the node; transitions are traced, not
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Fetching,
    Extracted,
    PersistQueued,
    Failed,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracted => "extracted",
            Self::PersistQueued => "persist-queued",
            Self::Failed => "failed",
        }
    }

    /// Whether the state machine permits moving to `next`
    pub fn can_advance_to(&self, next: NodeState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Extracted)
                | (Self::Fetching, Self::Failed)
                | (Self::Extracted, Self::PersistQueued)
                | (Self::Extracted, Self::Failed)
        )
    }
}
