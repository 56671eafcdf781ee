// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the node and member store boundary.
//!
//! Two variants of each trait are provided: one which is thread-safe
//! (futures implementing `Send`) and one which is purely intended for
//! single-threaded execution contexts.

use plenum_core::{Member, MimeId, Node, NodeId, UserId};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::event::StoreEvent;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matches the requested id or key.
    #[error("node not found")]
    NotFound,

    /// A sibling with the same key already exists. Surfaced as an actionable
    /// validation error, never retried automatically.
    #[error("key '{key}' already exists under this parent")]
    KeyConflict { key: String },

    /// The backend was unreachable or timed out. The only retryable kind;
    /// see [`crate::Retry`].
    #[error("transient store failure: {0}")]
    Transient(String),

    /// A payload could not be serialized on the way into the store.
    #[error("payload serialization failed: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Input record for node insertion.
///
/// Id, sibling index and timestamps are assigned by the store.
#[derive(Clone, Debug)]
pub struct NewNode {
    pub parent_id: Option<NodeId>,
    pub key: String,
    pub name: String,
    pub mime_id: MimeId,
    pub data: Value,
    pub mutable: bool,
    pub owner_id: Option<UserId>,
}

impl NewNode {
    pub fn new(parent_id: Option<NodeId>, key: impl Into<String>, mime_id: MimeId) -> Self {
        let key = key.into();
        Self {
            parent_id,
            name: key.clone(),
            key,
            mime_id,
            data: Value::Object(serde_json::Map::new()),
            mutable: true,
            owner_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    pub fn published(mut self) -> Self {
        self.mutable = false;
        self
    }
}

/// Closing half of a poll swap: the poll that was shut and the final
/// distinct-voter aggregate written onto it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedPoll {
    pub id: NodeId,
    pub voters: u64,
}

/// Outcome of [`LocalNodeStore::swap_active_poll`].
#[derive(Clone, Debug)]
pub struct PollSwap {
    pub closed: Option<ClosedPoll>,
    pub opened: Option<Node>,
}

/// Interface for storing, mutating and querying nodes.
#[trait_variant::make(NodeStore: Send)]
pub trait LocalNodeStore: Clone {
    /// Insert a node under a parent.
    ///
    /// The store assigns id, sibling index and timestamps. Fails with
    /// [`StoreError::KeyConflict`] when a sibling already uses the key and
    /// with [`StoreError::NotFound`] when the parent does not exist.
    async fn insert_node(&mut self, draft: NewNode) -> Result<Node, StoreError>;

    /// Point query by id.
    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Point query by `(parent, key)`, the resolver's single round trip.
    ///
    /// A `parent` of `None` addresses top-level nodes.
    async fn child_by_key(
        &self,
        parent: Option<NodeId>,
        key: &str,
    ) -> Result<Option<Node>, StoreError>;

    /// All children of a parent ordered by `(index, created_at)`.
    async fn children(&self, parent: Option<NodeId>) -> Result<Vec<Node>, StoreError>;

    /// Replace a node's payload.
    async fn update_data(&mut self, id: NodeId, data: Value) -> Result<Node, StoreError>;

    /// Rename a node's display label (not its key).
    async fn set_name(&mut self, id: NodeId, name: &str) -> Result<Node, StoreError>;

    /// Flip the draft/published (open/closed) flag.
    async fn set_mutable(&mut self, id: NodeId, mutable: bool) -> Result<Node, StoreError>;

    /// Delete a node, cascading to all descendants and associated members.
    ///
    /// Returns `false` when the node was not found.
    async fn delete_node(&mut self, id: NodeId) -> Result<bool, StoreError>;

    /// The context's currently open poll, if any.
    async fn active_poll(&self, context: NodeId) -> Result<Option<NodeId>, StoreError>;

    /// Atomically close the context's active poll and optionally open its
    /// successor.
    ///
    /// In one observable transition this (1) writes the final distinct-voter
    /// aggregate onto the poll being closed, (2) flips its `mutable` to
    /// false, and (3) when `new_poll` is given, inserts it and repoints the
    /// context's active pointer. Readers never observe two open polls for
    /// one context, nor an active pointer at a closed poll while an open
    /// successor exists. If step (3) fails after the close took effect the
    /// close stands; the context is simply left without an open poll, which
    /// is a recoverable state.
    async fn swap_active_poll(
        &mut self,
        context: NodeId,
        new_poll: Option<NewNode>,
    ) -> Result<PollSwap, StoreError>;

    /// Authoritative server timestamp in seconds, used once per session to
    /// establish the client's clock-skew offset.
    async fn server_time(&self) -> Result<u64, StoreError>;

    /// Subscribe to the store's change feed.
    ///
    /// Every mutation is delivered as a full-snapshot [`StoreEvent`]; narrow
    /// the feed with [`crate::SubscriptionFilter`].
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Interface for membership records.
#[trait_variant::make(MemberStore: Send)]
pub trait LocalMemberStore: Clone {
    /// Record an invitation or membership.
    ///
    /// Returns `false` when a record for `(context, user)` already exists
    /// and no insertion occurred.
    async fn insert_member(&mut self, member: Member) -> Result<bool, StoreError>;

    /// Point query for one membership.
    async fn member(
        &self,
        context: NodeId,
        user: UserId,
    ) -> Result<Option<Member>, StoreError>;

    /// Replace an existing membership record (acceptance, deactivation,
    /// role changes).
    ///
    /// Returns `false` when no record for `(context, user)` exists.
    async fn update_member(&mut self, member: Member) -> Result<bool, StoreError>;

    /// All memberships of a context.
    async fn members_of(&self, context: NodeId) -> Result<Vec<Member>, StoreError>;
}
