// SPDX-License-Identifier: MIT OR Apache-2.0

//! The mutability state machine for content and polls.
//!
//! Ordinary content moves `Draft -> Published` exactly once; there is no
//! public way back. Polls move `Open -> Closed`, either explicitly or
//! implicitly when a successor poll starts against the same context slot.
//! The close-prior/open-next sequence is delegated to the store's atomic
//! [`swap_active_poll`](plenum_store::LocalNodeStore::swap_active_poll) so
//! callers never issue it as two separate mutations.

use plenum_auth::{Acl, AuthError};
use plenum_core::{mime, MimeId, Node, NodeId, PollPayload, Registry, UserId, Variant};
use plenum_store::{ClosedPoll, MemberStore, NewNode, NodeStore, StoreError};

use crate::error::EngineError;

/// Publish/reopen transitions and the poll lifecycle.
#[derive(Clone, Debug)]
pub struct Lifecycle<S> {
    store: S,
    acl: Acl<S>,
}

impl<S> Lifecycle<S>
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

    async fn node(&self, id: NodeId) -> Result<Node, EngineError> {
        self.store.get_node(id).await?.ok_or(EngineError::NotFound)
    }

    async fn may_publish(&self, user: UserId, node: &Node) -> Result<bool, EngineError> {
        if node.owned_by(user) {
            return Ok(true);
        }
        Ok(self.acl.owns_context(Some(user), node).await?)
    }

    /// Publish a draft: `Draft -> Published`.
    ///
    /// Permitted to the node's owner and the context owner. Re-publishing an
    /// already published node is a no-op, not an error.
    pub async fn publish(&mut self, user: Option<UserId>, id: NodeId) -> Result<Node, EngineError> {
        let node = self.node(id).await?;
        let user = user.ok_or(AuthError::Unauthenticated)?;

        if !self.may_publish(user, &node).await? {
            return Err(AuthError::PermissionDenied.into());
        }
        if !node.mutable {
            // Idempotent: already published.
            return Ok(node);
        }

        let published = self.store.set_mutable(id, false).await?;
        tracing::debug!(node = %id, "published");
        Ok(published)
    }

    /// Administrative correction flipping a published node back to draft.
    ///
    /// Restricted to the context owner and deliberately not part of the
    /// authoring flow; there is no general "unpublish".
    pub async fn reopen(&mut self, user: Option<UserId>, id: NodeId) -> Result<Node, EngineError> {
        let node = self.node(id).await?;
        self.acl.require_context_owner(user, &node).await?;

        if node.mutable {
            return Ok(node);
        }
        let reopened = self.store.set_mutable(id, true).await?;
        tracing::debug!(node = %id, "reopened by administrator");
        Ok(reopened)
    }

    /// Start a poll against a context slot, snapshotting the source node's
    /// current option set.
    ///
    /// Any previously open poll of the context is closed in the same
    /// observable transition: the final voter aggregate is written, its
    /// `mutable` flips false, the successor is created and the context's
    /// active pointer repointed. Readers never see two open polls.
    pub async fn start_poll(
        &mut self,
        user: Option<UserId>,
        context_id: NodeId,
        source_id: NodeId,
    ) -> Result<Node, EngineError> {
        let context = self.node(context_id).await?;
        if !context.is_context(self.acl.registry()) {
            return Err(EngineError::NotAContext);
        }
        let user = self.acl.require_admin(user, &context).await?;

        let source = self.node(source_id).await?;
        // The source carries the option set and vote bounds; its payload
        // deserializes with the same defaults as a poll's.
        let source_payload: PollPayload = source.payload()?;
        let payload = PollPayload {
            source_node_id: Some(source.id),
            voters: None,
            ..source_payload
        };

        let key = format!("poll-{}", self.store.server_time().await?);
        let draft = NewNode::new(Some(context_id), key, MimeId::from(mime::POLL))
            .with_name(source.name.clone())
            .with_data(payload.to_value()?)
            .with_owner(user);

        let swap = self.store.swap_active_poll(context_id, Some(draft)).await?;
        let opened = swap.opened.ok_or(EngineError::NotAPoll)?;

        if let Some(closed) = &swap.closed {
            tracing::debug!(closed = %closed.id, voters = closed.voters, opened = %opened.id, "poll swapped");
        } else {
            tracing::debug!(opened = %opened.id, "poll started");
        }
        Ok(opened)
    }

    /// Explicitly stop the context's open poll.
    ///
    /// Returns the closing record, or `None` when no poll was open, which
    /// is a recoverable state and not an error.
    pub async fn stop_poll(
        &mut self,
        user: Option<UserId>,
        context_id: NodeId,
    ) -> Result<Option<ClosedPoll>, EngineError> {
        let context = self.node(context_id).await?;
        self.acl.require_admin(user, &context).await?;

        let swap = self.store.swap_active_poll(context_id, None).await?;
        Ok(swap.closed)
    }

    /// Cast (or revise) a ballot on an open poll.
    ///
    /// Ballots are append-only children of the poll; once it closes no
    /// further ballots are accepted. A user revoting replaces their own
    /// previous ballot, so the distinct-voter aggregate stays accurate.
    pub async fn cast_ballot(
        &mut self,
        user: Option<UserId>,
        poll_id: NodeId,
        options: &[usize],
    ) -> Result<Node, EngineError> {
        let poll = self.node(poll_id).await?;
        if poll.variant() != Variant::Poll {
            return Err(EngineError::NotAPoll);
        }
        if !poll.mutable {
            return Err(EngineError::PollClosed);
        }

        let payload: PollPayload = poll.payload()?;
        validate_ballot(options, &payload)?;

        let user = self
            .acl
            .require_insert(user, &poll, &MimeId::from(mime::BALLOT))
            .await?;

        let ballot = plenum_core::BallotPayload {
            options: options.to_vec(),
        };
        let draft = NewNode::new(Some(poll_id), format!("ballot-{user}"), MimeId::from(mime::BALLOT))
            .with_data(ballot.to_value()?)
            .with_owner(user);

        match self.store.insert_node(draft).await {
            Ok(node) => Ok(node),
            Err(StoreError::KeyConflict { .. }) => {
                // Revote: replace the user's existing ballot.
                let existing = self
                    .store
                    .child_by_key(Some(poll_id), &format!("ballot-{user}"))
                    .await?
                    .ok_or(EngineError::NotFound)?;
                Ok(self
                    .store
                    .update_data(existing.id, ballot.to_value()?)
                    .await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn validate_ballot(options: &[usize], payload: &PollPayload) -> Result<(), EngineError> {
    let count = options.len() as u32;
    if count < payload.min_vote || count > payload.max_vote {
        return Err(EngineError::InvalidBallot(format!(
            "select between {} and {} options",
            payload.min_vote, payload.max_vote
        )));
    }
    for &option in options {
        if option >= payload.options.len() {
            return Err(EngineError::InvalidBallot(format!(
                "option {option} does not exist"
            )));
        }
    }
    let mut seen = options.to_vec();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != options.len() {
        return Err(EngineError::InvalidBallot(
            "duplicate options selected".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use plenum_core::{Member, Role};
    use plenum_store::MemoryStore;
    use serde_json::json;

    use super::*;

    const ADMIN: UserId = UserId::from_raw(1);
    const AUTHOR: UserId = UserId::from_raw(2);
    const VOTER: UserId = UserId::from_raw(3);

    struct Fixture {
        lifecycle: Lifecycle<MemoryStore>,
        store: MemoryStore,
        group: Node,
        motion: Node,
    }

    /// A group owned by the admin with a policy motion carrying options.
    async fn fixture() -> Fixture {
        let mut store = MemoryStore::new();
        let group = store
            .insert_node(
                NewNode::new(None, "assembly", MimeId::from(mime::GROUP)).with_owner(ADMIN),
            )
            .await
            .expect("inserts");
        let motion = store
            .insert_node(
                NewNode::new(Some(group.id), "motion", MimeId::from(mime::POLICY_VOTE))
                    .with_data(json!({ "options": ["adopt", "reject", "postpone"] }))
                    .with_owner(AUTHOR),
            )
            .await
            .expect("inserts");

        Fixture {
            lifecycle: Lifecycle::new(store.clone()),
            store,
            group,
            motion,
        }
    }

    #[tokio::test]
    async fn publish_is_owner_or_context_owner_and_idempotent() {
        let mut f = fixture().await;

        let published = f
            .lifecycle
            .publish(Some(AUTHOR), f.motion.id)
            .await
            .expect("owner publishes");
        assert!(!published.mutable);

        // Second publish: no state change, no error.
        let again = f
            .lifecycle
            .publish(Some(AUTHOR), f.motion.id)
            .await
            .expect("no-op");
        assert_eq!(again.updated_at, published.updated_at);

        let denied = f.lifecycle.publish(Some(VOTER), f.group.id).await;
        assert!(matches!(
            denied,
            Err(EngineError::Auth(AuthError::PermissionDenied))
        ));
    }

    #[tokio::test]
    async fn reopen_is_context_owner_only() {
        let mut f = fixture().await;
        f.lifecycle
            .publish(Some(AUTHOR), f.motion.id)
            .await
            .expect("publishes");

        // The author cannot unpublish their own node.
        let denied = f.lifecycle.reopen(Some(AUTHOR), f.motion.id).await;
        assert!(matches!(
            denied,
            Err(EngineError::Auth(AuthError::PermissionDenied))
        ));

        let reopened = f
            .lifecycle
            .reopen(Some(ADMIN), f.motion.id)
            .await
            .expect("context owner reopens");
        assert!(reopened.mutable);
    }

    #[tokio::test]
    async fn start_poll_snapshots_the_source_options() {
        let mut f = fixture().await;

        let poll = f
            .lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts");

        let payload: PollPayload = poll.payload().expect("typed");
        assert_eq!(payload.options, vec!["adopt", "reject", "postpone"]);
        assert_eq!(payload.source_node_id, Some(f.motion.id));
        assert!(poll.mutable);
    }

    #[tokio::test]
    async fn successive_polls_never_leave_two_open() {
        let mut f = fixture().await;

        let first = f
            .lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts");
        f.lifecycle
            .cast_ballot(Some(VOTER), first.id, &[0])
            .await
            .expect("votes");

        let second = f
            .lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts successor");

        let first_again = f
            .store
            .get_node(first.id)
            .await
            .expect("no error")
            .expect("exists");
        assert!(!first_again.mutable, "predecessor closed");
        assert_eq!(first_again.data["voters"], json!(1));

        assert_eq!(
            f.store.active_poll(f.group.id).await.expect("no error"),
            Some(second.id)
        );

        // Exactly one open poll among the group's children.
        let open: Vec<_> = f
            .store
            .children(Some(f.group.id))
            .await
            .expect("no error")
            .into_iter()
            .filter(|node| node.mime_id.as_str() == mime::POLL && node.mutable)
            .collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);
    }

    #[tokio::test]
    async fn stopping_without_an_open_poll_is_recoverable() {
        let mut f = fixture().await;

        let closed = f
            .lifecycle
            .stop_poll(Some(ADMIN), f.group.id)
            .await
            .expect("no error");
        assert!(closed.is_none());

        // An admin can simply start a new poll afterwards.
        f.lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts");
    }

    #[tokio::test]
    async fn moderators_administer_polls() {
        let mut f = fixture().await;
        f.store
            .insert_member(Member {
                context_id: f.group.id,
                user_id: VOTER,
                accepted: true,
                active: true,
                role: Role::Moderator,
            })
            .await
            .expect("no error");

        f.lifecycle
            .start_poll(Some(VOTER), f.group.id, f.motion.id)
            .await
            .expect("moderator starts polls");

        let denied = f
            .lifecycle
            .start_poll(Some(AUTHOR), f.group.id, f.motion.id)
            .await;
        assert!(matches!(
            denied,
            Err(EngineError::Auth(AuthError::PermissionDenied))
        ));
    }

    #[tokio::test]
    async fn ballots_are_validated_and_closed_polls_reject_them() {
        let mut f = fixture().await;
        let poll = f
            .lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts");

        let too_many = f
            .lifecycle
            .cast_ballot(Some(VOTER), poll.id, &[0, 1])
            .await;
        assert!(matches!(too_many, Err(EngineError::InvalidBallot(_))));

        let out_of_range = f.lifecycle.cast_ballot(Some(VOTER), poll.id, &[9]).await;
        assert!(matches!(out_of_range, Err(EngineError::InvalidBallot(_))));

        f.lifecycle
            .cast_ballot(Some(VOTER), poll.id, &[1])
            .await
            .expect("valid ballot");

        f.lifecycle
            .stop_poll(Some(ADMIN), f.group.id)
            .await
            .expect("stops");

        let late = f.lifecycle.cast_ballot(Some(VOTER), poll.id, &[0]).await;
        assert!(matches!(late, Err(EngineError::PollClosed)));
    }

    #[tokio::test]
    async fn revoting_replaces_the_previous_ballot() {
        let mut f = fixture().await;
        let poll = f
            .lifecycle
            .start_poll(Some(ADMIN), f.group.id, f.motion.id)
            .await
            .expect("starts");

        let first = f
            .lifecycle
            .cast_ballot(Some(VOTER), poll.id, &[0])
            .await
            .expect("votes");
        let second = f
            .lifecycle
            .cast_ballot(Some(VOTER), poll.id, &[2])
            .await
            .expect("revotes");
        assert_eq!(first.id, second.id);
        assert_eq!(second.data["options"], json!([2]));

        // One distinct voter in the aggregate.
        let closed = f
            .lifecycle
            .stop_poll(Some(ADMIN), f.group.id)
            .await
            .expect("stops")
            .expect("was open");
        assert_eq!(closed.voters, 1);
    }

    #[tokio::test]
    async fn casting_on_a_non_poll_fails() {
        let mut f = fixture().await;

        let result = f
            .lifecycle
            .cast_ballot(Some(VOTER), f.motion.id, &[0])
            .await;
        assert!(matches!(result, Err(EngineError::NotAPoll)));
    }
}
