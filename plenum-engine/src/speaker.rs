// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO speaker queues attached to contexts.
//!
//! A `list/speaker` node collects `list/speak` entries in insertion order.
//! Advancing the queue removes the head entry and rewrites the list payload
//! with the seconds allotted to the next speaker; the resulting bump of
//! `updated_at` is the reference instant every client countdown derives
//! from.

use plenum_auth::Acl;
use plenum_core::{mime, MimeId, Node, NodeId, Registry, SpeakPayload, SpeakerlistPayload, UserId, Variant};
use plenum_store::{MemberStore, NewNode, NodeStore};

use crate::error::EngineError;

#[derive(Clone, Debug)]
pub struct SpeakerQueue<S> {
    store: S,
    acl: Acl<S>,
}

impl<S> SpeakerQueue<S>
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

    async fn list(&self, id: NodeId) -> Result<Node, EngineError> {
        let node = self.store.get_node(id).await?.ok_or(EngineError::NotFound)?;
        if node.variant() != Variant::Speakerlist {
            return Err(EngineError::NotASpeakerlist);
        }
        Ok(node)
    }

    /// Append an entry for `user` at the tail of the queue.
    ///
    /// `kind` distinguishes entry flavors, for instance a regular
    /// contribution from a point of order; the queue itself treats all
    /// kinds the same.
    pub async fn request_speak(
        &mut self,
        user: Option<UserId>,
        list_id: NodeId,
        name: &str,
        kind: &str,
    ) -> Result<Node, EngineError> {
        let list = self.list(list_id).await?;
        let user = self
            .acl
            .require_insert(user, &list, &MimeId::from(mime::SPEAK))
            .await?;

        let payload = SpeakPayload {
            name: name.to_string(),
            kind: kind.to_string(),
        };
        // The timestamp suffix lets a user queue up more than once.
        let key = format!("speak-{user}-{}", self.store.server_time().await?);
        let entry = NewNode::new(Some(list_id), key, MimeId::from(mime::SPEAK))
            .with_name(name)
            .with_data(payload.to_value()?)
            .with_owner(user);
        let node = self.store.insert_node(entry).await?;
        tracing::debug!(list = %list_id, entry = %node.id, "speaker queued");
        Ok(node)
    }

    /// The queue in speaking order, head first.
    pub async fn entries(&self, list_id: NodeId) -> Result<Vec<Node>, EngineError> {
        self.list(list_id).await?;
        let mut entries: Vec<Node> = self
            .store
            .children(Some(list_id))
            .await?
            .into_iter()
            .filter(|node| node.mime_id.as_str() == mime::SPEAK)
            .collect();
        entries.sort_by_key(|node| node.index);
        Ok(entries)
    }

    /// Remove `entry_id` from the queue without giving it the floor.
    ///
    /// Entry owners may withdraw themselves; administrators may strike any
    /// entry.
    pub async fn withdraw(
        &mut self,
        user: Option<UserId>,
        list_id: NodeId,
        entry_id: NodeId,
    ) -> Result<(), EngineError> {
        self.list(list_id).await?;
        let entry = self
            .store
            .get_node(entry_id)
            .await?
            .filter(|node| node.parent_id == Some(list_id))
            .ok_or(EngineError::NotFound)?;
        self.acl.require_mutate(user, &entry).await?;
        self.store.delete_node(entry_id).await?;
        Ok(())
    }

    /// Give the floor to the next speaker.
    ///
    /// Pops the head entry, writes `allotted` seconds into the list payload
    /// and returns the entry now speaking, or `None` when the queue ran
    /// empty. The payload write bumps the list's `updated_at`, which is the
    /// shared start-of-turn instant for countdown clients.
    pub async fn advance(
        &mut self,
        user: Option<UserId>,
        list_id: NodeId,
        allotted: u64,
    ) -> Result<Option<Node>, EngineError> {
        let list = self.list(list_id).await?;
        self.acl.require_admin(user, &list).await?;

        let mut queue = self.entries(list_id).await?;
        if !queue.is_empty() {
            let finished = queue.remove(0);
            self.store.delete_node(finished.id).await?;
        }

        let payload = SpeakerlistPayload { time: allotted };
        self.store.update_data(list_id, payload.to_value()?).await?;

        let next = queue.into_iter().next();
        match &next {
            Some(node) => tracing::debug!(list = %list_id, speaker = %node.id, allotted, "floor given"),
            None => tracing::debug!(list = %list_id, "speaker queue empty"),
        }
        Ok(next)
    }
}
