//! FILENAME: explorer-engine/src/lib.rs
//! Explorer subsystem: materializes aggregate query results into the
//! hierarchical, sorted node list behind the explorer navigation UI.
//!
//! The crate performs no I/O. The host runs the queries the store asks for
//! and renders the views it publishes.
//!
//! Layers:
//! - `definition`: Raw query-result shapes (what the transport DELIVERS)
//! - `member`: Label extraction and uniqueName structure
//! - `sort`: Per-pass sibling ordering strategies
//! - `tree`: Member tree construction and preorder flattening
//! - `ingest`: One materialization pass (HOW a result becomes a view)
//! - `view`: Renderable output for the UI (WHAT we display)
//! - `store`: Load locking, query flights and selection refresh

pub mod collapse;
pub mod config;
pub mod definition;
pub mod error;
pub mod ingest;
pub mod member;
pub mod sort;
pub mod store;
pub mod tree;
pub mod view;

pub use collapse::{CollapsePolicy, CollapseTracker, SeededCollapse};
pub use config::{ExplorerConfig, SupersedePolicy};
pub use definition::*;
pub use error::ExplorerError;
pub use ingest::{materialize, GroupScan, PassInput, ResultIngestor, SelectionIndex};
pub use member::member_label;
pub use sort::{NodeComparator, SortStrategy};
pub use store::{
    ExplorerStore, LoadRequest, QueryKind, QueryRequest, QuerySource, StoreEvent,
};
pub use tree::{ExplorerTree, NodeId};
pub use view::{ExplorerNode, ExplorerView, MaxCount, OrphanedNode};
