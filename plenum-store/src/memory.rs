// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for the plenum content tree.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use plenum_core::{mime, Member, Node, NodeId, UserId};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::event::StoreEvent;
use crate::traits::{
    ClosedPoll, MemberStore, NewNode, NodeStore, PollSwap, StoreError,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// An in-memory store for nodes and members.
#[derive(Debug)]
pub struct InnerMemoryStore {
    nodes: HashMap<NodeId, Node>,
    by_key: HashMap<(Option<NodeId>, String), NodeId>,
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
    members: BTreeMap<(NodeId, UserId), Member>,
    /// Shadow index of each context's currently open poll. The same
    /// reference is written into the context node's `data.active` so
    /// subscribers see the pointer move with the snapshot.
    active: HashMap<NodeId, NodeId>,
    next_id: u64,
    clock: u64,
    fault_budget: u32,
}

/// An in-memory store for nodes and members.
///
/// `MemoryStore` supports usage in asynchronous and multi-threaded contexts
/// by wrapping an `InnerMemoryStore` with an `RwLock` and `Arc`. Convenience
/// methods are provided to obtain a read- or write-lock on the underlying
/// store. All clones share state and the same event feed.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        let inner = InnerMemoryStore {
            nodes: HashMap::new(),
            by_key: HashMap::new(),
            children: HashMap::new(),
            members: BTreeMap::new(),
            active: HashMap::new(),
            next_id: 0,
            clock: 0,
            fault_budget: 0,
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(RwLock::new(inner)),
            events,
        }
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Make the next `failures` point queries fail with
    /// [`StoreError::Transient`]. Test hook for the retry wrapper.
    #[cfg(test)]
    pub(crate) fn inject_transient(&self, failures: u32) {
        self.write_store().fault_budget = failures;
    }

    fn emit(&self, events: Vec<StoreEvent>) {
        for event in events {
            // Nobody listening is fine.
            let _ = self.events.send(event);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InnerMemoryStore {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn take_fault(&mut self) -> Option<StoreError> {
        if self.fault_budget > 0 {
            self.fault_budget -= 1;
            Some(StoreError::Transient("injected fault".to_string()))
        } else {
            None
        }
    }

    fn insert_unlocked(&mut self, draft: NewNode) -> Result<Node, StoreError> {
        if let Some(parent) = draft.parent_id {
            if !self.nodes.contains_key(&parent) {
                return Err(StoreError::NotFound);
            }
        }

        let slot = (draft.parent_id, draft.key.clone());
        if self.by_key.contains_key(&slot) {
            return Err(StoreError::KeyConflict { key: draft.key });
        }

        self.next_id += 1;
        let id = NodeId::from_raw(self.next_id);
        let now = self.tick();
        let siblings = self.children.entry(draft.parent_id).or_default();
        let node = Node {
            id,
            parent_id: draft.parent_id,
            key: draft.key,
            name: draft.name,
            mime_id: draft.mime_id,
            data: draft.data,
            mutable: draft.mutable,
            owner_id: draft.owner_id,
            index: siblings.len() as i64,
            created_at: now,
            updated_at: now,
        };

        siblings.push(id);
        self.by_key.insert(slot, id);
        self.nodes.insert(id, node.clone());

        Ok(node)
    }

    fn touch(&mut self, id: NodeId) -> Result<&mut Node, StoreError> {
        let now = self.tick();
        let node = self.nodes.get_mut(&id).ok_or(StoreError::NotFound)?;
        node.updated_at = now;
        Ok(node)
    }

    /// Collect `id` and all its descendants, children before parents not
    /// guaranteed; callers only need the set.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            collected.push(current);
            if let Some(children) = self.children.get(&Some(current)) {
                stack.extend(children.iter().copied());
            }
        }
        collected
    }

    fn distinct_ballot_owners(&self, poll: NodeId) -> u64 {
        let mut owners: HashSet<UserId> = HashSet::new();
        if let Some(children) = self.children.get(&Some(poll)) {
            for child_id in children {
                if let Some(child) = self.nodes.get(child_id) {
                    if child.mime_id.as_str() == mime::BALLOT {
                        if let Some(owner) = child.owner_id {
                            owners.insert(owner);
                        }
                    }
                }
            }
        }
        owners.len() as u64
    }

    fn set_active_pointer(&mut self, context: NodeId, poll: Option<NodeId>) {
        match poll {
            Some(poll) => {
                self.active.insert(context, poll);
            }
            None => {
                self.active.remove(&context);
            }
        }
        let now = self.tick();
        if let Some(node) = self.nodes.get_mut(&context) {
            let pointer = match poll {
                Some(poll) => serde_json::json!(poll),
                None => Value::Null,
            };
            match node.data.as_object_mut() {
                Some(object) => {
                    object.insert("active".to_string(), pointer);
                }
                None => {
                    node.data = serde_json::json!({ "active": pointer });
                }
            }
            node.updated_at = now;
        }
    }

    /// Close the context's active poll: write the voter aggregate, flip
    /// `mutable`, clear the pointer. Part of the atomic swap.
    fn close_active_unlocked(&mut self, context: NodeId) -> Option<(ClosedPoll, Node)> {
        let poll_id = self.active.get(&context).copied()?;
        let voters = self.distinct_ballot_owners(poll_id);
        let now = self.tick();

        let poll = self.nodes.get_mut(&poll_id)?;
        poll.mutable = false;
        poll.updated_at = now;
        match poll.data.as_object_mut() {
            Some(object) => {
                object.insert("voters".to_string(), serde_json::json!(voters));
            }
            None => {
                poll.data = serde_json::json!({ "voters": voters });
            }
        }
        let snapshot = poll.clone();

        self.set_active_pointer(context, None);

        Some((ClosedPoll { id: poll_id, voters }, snapshot))
    }
}

impl NodeStore for MemoryStore {
    async fn insert_node(&mut self, draft: NewNode) -> Result<Node, StoreError> {
        let node = self.write_store().insert_unlocked(draft)?;
        self.emit(vec![StoreEvent::Changed(node.clone())]);
        Ok(node)
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        if let Some(fault) = self.write_store().take_fault() {
            return Err(fault);
        }
        Ok(self.read_store().nodes.get(&id).cloned())
    }

    async fn child_by_key(
        &self,
        parent: Option<NodeId>,
        key: &str,
    ) -> Result<Option<Node>, StoreError> {
        let store = self.read_store();
        match store.by_key.get(&(parent, key.to_string())) {
            Some(id) => Ok(store.nodes.get(id).cloned()),
            None => Ok(None),
        }
    }

    async fn children(&self, parent: Option<NodeId>) -> Result<Vec<Node>, StoreError> {
        let store = self.read_store();
        let Some(ids) = store.children.get(&parent) else {
            return Ok(Vec::new());
        };
        let mut nodes: Vec<Node> = ids
            .iter()
            .filter_map(|id| store.nodes.get(id).cloned())
            .collect();
        nodes.sort_by_key(|node| (node.index, node.created_at));
        Ok(nodes)
    }

    async fn update_data(&mut self, id: NodeId, data: Value) -> Result<Node, StoreError> {
        let node = {
            let mut store = self.write_store();
            let node = store.touch(id)?;
            node.data = data;
            node.clone()
        };
        self.emit(vec![StoreEvent::Changed(node.clone())]);
        Ok(node)
    }

    async fn set_name(&mut self, id: NodeId, name: &str) -> Result<Node, StoreError> {
        let node = {
            let mut store = self.write_store();
            let node = store.touch(id)?;
            node.name = name.to_string();
            node.clone()
        };
        self.emit(vec![StoreEvent::Changed(node.clone())]);
        Ok(node)
    }

    async fn set_mutable(&mut self, id: NodeId, mutable: bool) -> Result<Node, StoreError> {
        let node = {
            let mut store = self.write_store();
            let node = store.touch(id)?;
            node.mutable = mutable;
            node.clone()
        };
        self.emit(vec![StoreEvent::Changed(node.clone())]);
        Ok(node)
    }

    async fn delete_node(&mut self, id: NodeId) -> Result<bool, StoreError> {
        let removed = {
            let mut store = self.write_store();
            if !store.nodes.contains_key(&id) {
                return Ok(false);
            }

            let removed = store.subtree(id);
            let removed_set: HashSet<NodeId> = removed.iter().copied().collect();

            for node_id in &removed {
                if let Some(node) = store.nodes.remove(node_id) {
                    store.by_key.remove(&(node.parent_id, node.key));
                }
                store.children.remove(&Some(*node_id));
                store.active.remove(node_id);
            }
            store
                .active
                .retain(|_, poll| !removed_set.contains(poll));
            store
                .members
                .retain(|(context, _), _| !removed_set.contains(context));

            // Unlink the subtree root from its parent's ordering.
            if let Some(node_parent) = store
                .children
                .values_mut()
                .find(|siblings| siblings.contains(&id))
            {
                node_parent.retain(|sibling| *sibling != id);
            }

            removed
        };

        self.emit(removed.into_iter().map(StoreEvent::Deleted).collect());
        Ok(true)
    }

    async fn active_poll(&self, context: NodeId) -> Result<Option<NodeId>, StoreError> {
        Ok(self.read_store().active.get(&context).copied())
    }

    async fn swap_active_poll(
        &mut self,
        context: NodeId,
        new_poll: Option<NewNode>,
    ) -> Result<PollSwap, StoreError> {
        // Everything below happens under one write lock: no reader observes
        // the closed predecessor without the repointed successor.
        let mut store = self.write_store();

        if !store.nodes.contains_key(&context) {
            return Err(StoreError::NotFound);
        }

        let closed = store.close_active_unlocked(context);

        let opened = match new_poll {
            Some(draft) => {
                let inserted = store.insert_unlocked(draft);
                match inserted {
                    Ok(node) => {
                        store.set_active_pointer(context, Some(node.id));
                        Some(node)
                    }
                    Err(err) => {
                        // The close stands; surface the failure after
                        // announcing what did change.
                        let mut events = Vec::new();
                        if let Some((_, snapshot)) = closed {
                            events.push(StoreEvent::Changed(snapshot));
                        }
                        if let Some(context_node) = store.nodes.get(&context) {
                            events.push(StoreEvent::Changed(context_node.clone()));
                        }
                        drop(store);
                        self.emit(events);
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        let mut events = Vec::new();
        let closed = closed.map(|(closed, snapshot)| {
            events.push(StoreEvent::Changed(snapshot));
            closed
        });
        if let Some(node) = &opened {
            events.push(StoreEvent::Changed(node.clone()));
        }
        if let Some(context_node) = store.nodes.get(&context) {
            events.push(StoreEvent::Changed(context_node.clone()));
        }
        drop(store);
        self.emit(events);

        Ok(PollSwap { closed, opened })
    }

    async fn server_time(&self) -> Result<u64, StoreError> {
        Ok(self.read_store().clock)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

impl MemberStore for MemoryStore {
    async fn insert_member(&mut self, member: Member) -> Result<bool, StoreError> {
        let mut store = self.write_store();
        let slot = (member.context_id, member.user_id);
        if store.members.contains_key(&slot) {
            return Ok(false);
        }
        store.members.insert(slot, member);
        Ok(true)
    }

    async fn member(
        &self,
        context: NodeId,
        user: UserId,
    ) -> Result<Option<Member>, StoreError> {
        Ok(self.read_store().members.get(&(context, user)).cloned())
    }

    async fn update_member(&mut self, member: Member) -> Result<bool, StoreError> {
        let mut store = self.write_store();
        let slot = (member.context_id, member.user_id);
        if !store.members.contains_key(&slot) {
            return Ok(false);
        }
        store.members.insert(slot, member);
        Ok(true)
    }

    async fn members_of(&self, context: NodeId) -> Result<Vec<Member>, StoreError> {
        Ok(self
            .read_store()
            .members
            .range((context, UserId::from_raw(u64::MIN))..=(context, UserId::from_raw(u64::MAX)))
            .map(|(_, member)| member.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use plenum_core::{MimeId, Role};
    use serde_json::json;

    use crate::event::SubscriptionFilter;

    use super::*;

    fn folder(parent: Option<NodeId>, key: &str, owner: u64) -> NewNode {
        NewNode::new(parent, key, MimeId::from(mime::FOLDER))
            .with_owner(UserId::from_raw(owner))
    }

    fn poll(context: NodeId, key: &str, owner: u64) -> NewNode {
        NewNode::new(Some(context), key, MimeId::from(mime::POLL))
            .with_data(json!({ "options": ["yes", "no"] }))
            .with_owner(UserId::from_raw(owner))
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_sibling_order() {
        let mut store = MemoryStore::new();

        let first = store
            .insert_node(folder(None, "alpha", 1))
            .await
            .expect("inserts");
        let second = store
            .insert_node(folder(None, "beta", 1))
            .await
            .expect("inserts");

        assert_ne!(first.id, second.id);
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);

        let top_level = store.children(None).await.expect("no error");
        assert_eq!(
            top_level.iter().map(|n| n.key.as_str()).collect::<Vec<_>>(),
            vec!["alpha", "beta"]
        );
    }

    #[tokio::test]
    async fn duplicate_keys_conflict() {
        let mut store = MemoryStore::new();
        store
            .insert_node(folder(None, "intro", 1))
            .await
            .expect("inserts");

        let result = store.insert_node(folder(None, "intro", 2)).await;
        assert!(matches!(
            result,
            Err(StoreError::KeyConflict { key }) if key == "intro"
        ));
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let mut store = MemoryStore::new();
        let result = store
            .insert_node(folder(Some(NodeId::from_raw(99)), "lost", 1))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn child_by_key_walks_one_level() {
        let mut store = MemoryStore::new();
        let parent = store
            .insert_node(folder(None, "intro", 1))
            .await
            .expect("inserts");
        let child = store
            .insert_node(folder(Some(parent.id), "q1", 1))
            .await
            .expect("inserts");

        let found = store
            .child_by_key(Some(parent.id), "q1")
            .await
            .expect("no error")
            .expect("child exists");
        assert_eq!(found.id, child.id);

        let missing = store
            .child_by_key(Some(parent.id), "q2")
            .await
            .expect("no error");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_cascades_to_descendants_and_members() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");
        let folder_node = store
            .insert_node(folder(Some(group.id), "docs", 1))
            .await
            .expect("inserts");
        let leaf = store
            .insert_node(folder(Some(folder_node.id), "deep", 1))
            .await
            .expect("inserts");
        store
            .insert_member(Member {
                context_id: group.id,
                user_id: UserId::from_raw(5),
                accepted: true,
                active: true,
                role: Role::Contributor,
            })
            .await
            .expect("no error");

        assert!(store.delete_node(group.id).await.expect("no error"));

        assert!(store.get_node(leaf.id).await.expect("no error").is_none());
        assert!(
            store
                .member(group.id, UserId::from_raw(5))
                .await
                .expect("no error")
                .is_none()
        );
        // The key is free again.
        store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("key reusable after cascade");
    }

    #[tokio::test]
    async fn deleting_twice_reports_absence() {
        let mut store = MemoryStore::new();
        let node = store
            .insert_node(folder(None, "once", 1))
            .await
            .expect("inserts");

        assert!(store.delete_node(node.id).await.expect("no error"));
        assert!(!store.delete_node(node.id).await.expect("no error"));
    }

    #[tokio::test]
    async fn swap_opens_first_poll_without_closing_anything() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");

        let swap = store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-1", 1)))
            .await
            .expect("swaps");

        assert!(swap.closed.is_none());
        let opened = swap.opened.expect("opened");
        assert_eq!(
            store.active_poll(group.id).await.expect("no error"),
            Some(opened.id)
        );

        let context = store
            .get_node(group.id)
            .await
            .expect("no error")
            .expect("exists");
        assert_eq!(context.data["active"], json!(opened.id));
    }

    #[tokio::test]
    async fn swap_closes_predecessor_with_voter_aggregate() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");
        let first = store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-1", 1)))
            .await
            .expect("swaps")
            .opened
            .expect("opened");

        // Two voters, one of them voting twice.
        for (key, owner) in [("b1", 10), ("b2", 11), ("b3", 10)] {
            store
                .insert_node(
                    NewNode::new(Some(first.id), key, MimeId::from(mime::BALLOT))
                        .with_data(json!({ "options": [0] }))
                        .with_owner(UserId::from_raw(owner)),
                )
                .await
                .expect("inserts");
        }

        let swap = store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-2", 1)))
            .await
            .expect("swaps");

        let closed = swap.closed.expect("closed");
        assert_eq!(closed.id, first.id);
        assert_eq!(closed.voters, 2);

        let first_again = store
            .get_node(first.id)
            .await
            .expect("no error")
            .expect("exists");
        assert!(!first_again.mutable);
        assert_eq!(first_again.data["voters"], json!(2));

        let second = swap.opened.expect("opened");
        assert_eq!(
            store.active_poll(group.id).await.expect("no error"),
            Some(second.id)
        );
    }

    #[tokio::test]
    async fn swap_to_none_is_the_explicit_stop() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");
        store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-1", 1)))
            .await
            .expect("swaps");

        let swap = store
            .swap_active_poll(group.id, None)
            .await
            .expect("swaps");
        assert!(swap.closed.is_some());
        assert!(swap.opened.is_none());
        assert_eq!(store.active_poll(group.id).await.expect("no error"), None);

        let context = store
            .get_node(group.id)
            .await
            .expect("no error")
            .expect("exists");
        assert_eq!(context.data["active"], Value::Null);
    }

    #[tokio::test]
    async fn failed_successor_keeps_the_close() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");
        let first = store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-1", 1)))
            .await
            .expect("swaps")
            .opened
            .expect("opened");

        // Successor reuses a taken key: insertion fails after the close.
        let result = store
            .swap_active_poll(group.id, Some(poll(group.id, "poll-1", 1)))
            .await;
        assert!(matches!(result, Err(StoreError::KeyConflict { .. })));

        let first_again = store
            .get_node(first.id)
            .await
            .expect("no error")
            .expect("exists");
        assert!(!first_again.mutable);
        assert_eq!(store.active_poll(group.id).await.expect("no error"), None);
    }

    #[tokio::test]
    async fn acknowledged_writes_are_read_back() {
        let mut store = MemoryStore::new();
        let node = store
            .insert_node(folder(None, "doc", 1))
            .await
            .expect("inserts");

        store
            .update_data(node.id, json!({ "body": "hello" }))
            .await
            .expect("updates");

        let read = store
            .get_node(node.id)
            .await
            .expect("no error")
            .expect("exists");
        assert_eq!(read.data["body"], json!("hello"));
        assert!(read.updated_at > node.updated_at);
    }

    #[tokio::test]
    async fn subscriptions_deliver_full_snapshots() {
        let mut store = MemoryStore::new();
        let mut feed = store.subscribe();

        let node = store
            .insert_node(folder(None, "watched", 1))
            .await
            .expect("inserts");
        store
            .set_name(node.id, "Watched")
            .await
            .expect("renames");

        let filter = SubscriptionFilter::ById(node.id);

        let inserted = feed.recv().await.expect("event");
        assert!(filter.matches(&inserted));

        let renamed = feed.recv().await.expect("event");
        match renamed {
            StoreEvent::Changed(snapshot) => assert_eq!(snapshot.name, "Watched"),
            other => panic!("expected change event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn membership_records_roundtrip() {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(NewNode::new(None, "assembly", MimeId::from(mime::GROUP)))
            .await
            .expect("inserts");

        let invitation =
            Member::invitation(group.id, UserId::from_raw(7), Role::Contributor);
        assert!(store.insert_member(invitation.clone()).await.expect("no error"));
        assert!(!store.insert_member(invitation.clone()).await.expect("no error"));

        let accepted = Member {
            accepted: true,
            ..invitation
        };
        assert!(store.update_member(accepted).await.expect("no error"));

        let member = store
            .member(group.id, UserId::from_raw(7))
            .await
            .expect("no error")
            .expect("exists");
        assert!(member.in_good_standing());

        assert_eq!(store.members_of(group.id).await.expect("no error").len(), 1);
    }
}
