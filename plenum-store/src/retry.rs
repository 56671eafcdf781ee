// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, transparent retries for transient backend failures.
//!
//! Only [`StoreError::Transient`] is retried; every other kind surfaces to
//! the caller immediately. Key conflicts in particular are actionable
//! validation errors and must never be retried automatically.

use plenum_core::{Member, Node, NodeId, UserId};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::event::StoreEvent;
use crate::traits::{MemberStore, NewNode, NodeStore, PollSwap, StoreError};

pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Store wrapper retrying transient failures a bounded number of times.
#[derive(Clone, Debug)]
pub struct Retry<S> {
    inner: S,
    limit: u32,
}

impl<S> Retry<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            limit: DEFAULT_RETRY_LIMIT,
        }
    }

    pub fn with_limit(inner: S, limit: u32) -> Self {
        Self { inner, limit }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

macro_rules! with_retry {
    ($self:ident, $call:expr) => {{
        let mut attempt = 0;
        loop {
            match $call {
                Err(StoreError::Transient(reason)) if attempt < $self.limit => {
                    attempt += 1;
                    tracing::warn!(attempt, limit = $self.limit, %reason, "transient store failure, retrying");
                }
                other => break other,
            }
        }
    }};
}

impl<S> NodeStore for Retry<S>
where
    S: NodeStore + Send + Sync,
{
    async fn insert_node(&mut self, draft: NewNode) -> Result<Node, StoreError> {
        with_retry!(self, self.inner.insert_node(draft.clone()).await)
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        with_retry!(self, self.inner.get_node(id).await)
    }

    async fn child_by_key(
        &self,
        parent: Option<NodeId>,
        key: &str,
    ) -> Result<Option<Node>, StoreError> {
        with_retry!(self, self.inner.child_by_key(parent, key).await)
    }

    async fn children(&self, parent: Option<NodeId>) -> Result<Vec<Node>, StoreError> {
        with_retry!(self, self.inner.children(parent).await)
    }

    async fn update_data(&mut self, id: NodeId, data: Value) -> Result<Node, StoreError> {
        with_retry!(self, self.inner.update_data(id, data.clone()).await)
    }

    async fn set_name(&mut self, id: NodeId, name: &str) -> Result<Node, StoreError> {
        with_retry!(self, self.inner.set_name(id, name).await)
    }

    async fn set_mutable(&mut self, id: NodeId, mutable: bool) -> Result<Node, StoreError> {
        with_retry!(self, self.inner.set_mutable(id, mutable).await)
    }

    async fn delete_node(&mut self, id: NodeId) -> Result<bool, StoreError> {
        with_retry!(self, self.inner.delete_node(id).await)
    }

    async fn active_poll(&self, context: NodeId) -> Result<Option<NodeId>, StoreError> {
        with_retry!(self, self.inner.active_poll(context).await)
    }

    async fn swap_active_poll(
        &mut self,
        context: NodeId,
        new_poll: Option<NewNode>,
    ) -> Result<PollSwap, StoreError> {
        // The swap is atomic at the backend; a transient failure means it
        // did not take effect and the whole compound operation is retried.
        with_retry!(
            self,
            self.inner.swap_active_poll(context, new_poll.clone()).await
        )
    }

    async fn server_time(&self) -> Result<u64, StoreError> {
        with_retry!(self, self.inner.server_time().await)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.subscribe()
    }
}

impl<S> MemberStore for Retry<S>
where
    S: MemberStore + Send + Sync,
{
    async fn insert_member(&mut self, member: Member) -> Result<bool, StoreError> {
        with_retry!(self, self.inner.insert_member(member.clone()).await)
    }

    async fn member(
        &self,
        context: NodeId,
        user: UserId,
    ) -> Result<Option<Member>, StoreError> {
        with_retry!(self, self.inner.member(context, user).await)
    }

    async fn update_member(&mut self, member: Member) -> Result<bool, StoreError> {
        with_retry!(self, self.inner.update_member(member.clone()).await)
    }

    async fn members_of(&self, context: NodeId) -> Result<Vec<Member>, StoreError> {
        with_retry!(self, self.inner.members_of(context).await)
    }
}
