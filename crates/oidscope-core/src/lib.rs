//! Operation engine and result reconstruction between `oidscope-api` and
//! UI consumers (CLI today).
//!
//! - **[`Session`]**: one connection to one agent. Single-shot
//!   [`get`](Session::get) / [`get_next`](Session::get_next), cancellable
//!   batched walks via [`start_walk`](Session::start_walk), and table
//!   fetches. At most one walk per session; the transport is serialised
//!   behind an async mutex.
//!
//! - **[`WalkHandle`]**: consumer side of a walk. Pulls batches off a
//!   bounded queue, so a slow consumer suspends the producer.
//!
//! - **[`ResultHistory`]**: capped, cursor-navigable store of
//!   [`ResultGroup`]s.
//!
//! - **[`ResultTree`]** and [`TableWalkCollector`]: the two
//!   reconstructions of a flat value stream, grouped by schema ancestry
//!   or aligned into rows and columns.
//!
//! - **[`Explorer`]**: the orchestrator a UI drives. Dispatch an
//!   operation, await its [`Task`], feed the [`Message`] back through
//!   [`Explorer::update`] and read [`Outcome`]s off the channel.
//!
//! Object names, enumerations and table layouts come from a [`Schema`];
//! [`StaticSchema`] is the in-memory implementation.

pub mod config;
pub mod error;
pub mod explorer;
pub mod format;
pub mod model;
pub mod schema;
pub mod session;
pub mod store;
pub mod table;
pub mod tree;
pub mod walk;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, SessionProfile};
pub use error::CoreError;
pub use explorer::{Explorer, Message, Outcome, Task};
pub use format::{format_value, format_varbind, resolve_name};
pub use model::{OpKind, ResultGroup, SnmpResult};
pub use schema::{NodeKind, Schema, SchemaNode, StaticSchema};
pub use session::{ConnectionState, OpTask, Session, disconnect, is_connected};
pub use store::ResultHistory;
pub use table::{PLACEHOLDER, TableColumn, TableData, TableRow, TableSchema, TableWalkCollector};
pub use tree::{ResultTree, TreeNode, TreeRow};
pub use walk::{
    Enumerator, WalkEvent, WalkHandle, WalkOutcome, WalkPulled, WalkState, WalkStrategy,
};

// Protocol types consumers need alongside the core.
pub use oidscope_api::{Credentials, Oid, Transport, Value, VarBind, Version};
