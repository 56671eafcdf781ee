// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission-guarded content mutations.
//!
//! The permission evaluator is consulted before any mutating action is
//! exposed; the store itself stays dumb. All mutations are fire-and-forget
//! against the authoritative store, which arbitrates concurrent writers.

use plenum_auth::{Acl, AuthError};
use plenum_core::{Node, NodeId, Registry, UserId};
use plenum_store::{MemberStore, NewNode, NodeStore};
use serde_json::Value;

use crate::error::EngineError;

/// Guarded insert/update/delete over the content tree.
#[derive(Clone, Debug)]
pub struct Content<S> {
    store: S,
    acl: Acl<S>,
}

impl<S> Content<S>
where
    S: NodeStore + MemberStore + Send + Sync,
{
    pub fn new(store: S) -> Self {
        let acl = Acl::new(store.clone(), Registry::default());
        Self { store, acl }
    }

    pub fn with_registry(store: S, registry: Registry) -> Self {
        let acl = Acl::new(store.clone(), registry);
        Self { store, acl }
    }

    pub fn acl(&self) -> &Acl<S> {
        &self.acl
    }

    async fn node(&self, id: NodeId) -> Result<Node, EngineError> {
        self.store.get_node(id).await?.ok_or(EngineError::NotFound)
    }

    /// Insert a node, owned by the acting user.
    ///
    /// Top-level inserts (no parent) only require a session; everything
    /// below a parent goes through the full insert evaluation.
    pub async fn insert(
        &mut self,
        user: Option<UserId>,
        draft: NewNode,
    ) -> Result<Node, EngineError> {
        let user = match draft.parent_id {
            Some(parent_id) => {
                let parent = self.node(parent_id).await?;
                self.acl
                    .require_insert(user, &parent, &draft.mime_id)
                    .await?
            }
            None => user.ok_or(AuthError::Unauthenticated)?,
        };

        let node = self.store.insert_node(draft.with_owner(user)).await?;
        tracing::debug!(node = %node.id, mime = %node.mime_id, "node inserted");
        Ok(node)
    }

    /// Replace a node's payload.
    pub async fn update(
        &mut self,
        user: Option<UserId>,
        id: NodeId,
        data: Value,
    ) -> Result<Node, EngineError> {
        let node = self.node(id).await?;
        self.acl.require_mutate(user, &node).await?;
        Ok(self.store.update_data(id, data).await?)
    }

    /// Rename a node's display label.
    pub async fn rename(
        &mut self,
        user: Option<UserId>,
        id: NodeId,
        name: &str,
    ) -> Result<Node, EngineError> {
        let node = self.node(id).await?;
        self.acl.require_mutate(user, &node).await?;
        Ok(self.store.set_name(id, name).await?)
    }

    /// Delete a node, cascading to descendants and members.
    pub async fn delete(&mut self, user: Option<UserId>, id: NodeId) -> Result<(), EngineError> {
        let node = self.node(id).await?;
        let user = user.ok_or(AuthError::Unauthenticated)?;
        if !self.acl.can_delete(Some(user), &node).await? {
            return Err(AuthError::PermissionDenied.into());
        }
        self.store.delete_node(id).await?;
        tracing::debug!(node = %id, "node deleted");
        Ok(())
    }
}
