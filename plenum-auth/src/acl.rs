// SPDX-License-Identifier: MIT OR Apache-2.0

//! The permission evaluator.

use plenum_core::{MimeId, Node, NodeId, Registry, UserId};
use plenum_store::{MemberStore, NodeStore};

use crate::error::AuthError;

/// Evaluates insert/read/mutate/delete rights against the store.
///
/// All checks are point-in-time reads; the store remains the sole arbiter of
/// ordering, so a concurrent membership change can race an evaluation the
/// same way it would race the guarded mutation itself.
#[derive(Clone, Debug)]
pub struct Acl<S> {
    store: S,
    registry: Registry,
}

impl<S> Acl<S>
where
    S: NodeStore + MemberStore + Sync,
{
    pub fn new(store: S, registry: Registry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Nearest ancestor (including `node` itself) which scopes a permission
    /// domain.
    pub async fn context_of(&self, node: &Node) -> Result<Option<Node>, AuthError> {
        let mut current = node.clone();
        loop {
            if current.is_context(&self.registry) {
                return Ok(Some(current));
            }
            match current.parent_id {
                Some(parent) => {
                    current = self
                        .store
                        .get_node(parent)
                        .await?
                        .ok_or(AuthError::Store(plenum_store::StoreError::NotFound))?;
                }
                None => return Ok(None),
            }
        }
    }

    /// Whether `user` owns the context enclosing `node` (or `node` itself if
    /// it is a context).
    pub async fn owns_context(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<bool, AuthError> {
        let Some(user) = user else {
            return Ok(false);
        };
        Ok(self
            .context_of(node)
            .await?
            .is_some_and(|context| context.owned_by(user)))
    }

    /// Whether `user` administers the context enclosing `node`: owns it, or
    /// holds an accepted and active moderator membership in it.
    pub async fn is_admin(&self, user: Option<UserId>, node: &Node) -> Result<bool, AuthError> {
        let Some(user) = user else {
            return Ok(false);
        };
        let Some(context) = self.context_of(node).await? else {
            return Ok(false);
        };
        if context.owned_by(user) {
            return Ok(true);
        }
        let member = self.store.member(context.id, user).await?;
        Ok(member.is_some_and(|member| {
            member.in_good_standing() && member.role == plenum_core::Role::Moderator
        }))
    }

    /// May `user` insert a child tagged `child_mime` under `target`?
    ///
    /// Grants, in order of checking: the target's descriptor is attachable
    /// and the target is currently mutable; the user owns the enclosing
    /// context; the user holds an accepted and active membership whose role
    /// covers the child tag. The target's descriptor must list the child tag
    /// as insertable in every case. Anonymous users insert nothing.
    pub async fn can_insert(
        &self,
        user: Option<UserId>,
        target: &Node,
        child_mime: &MimeId,
    ) -> Result<bool, AuthError> {
        if !self.registry.insertable(&target.mime_id, child_mime) {
            return Ok(false);
        }
        let Some(user) = user else {
            return Ok(false);
        };

        let attachable = self
            .registry
            .describe(&target.mime_id)
            .map(|descriptor| descriptor.attachable)
            .unwrap_or(false);
        if attachable && target.mutable {
            return Ok(true);
        }

        if let Some(context) = self.context_of(target).await? {
            if context.owned_by(user) {
                return Ok(true);
            }
            if let Some(member) = self.store.member(context.id, user).await? {
                if member.in_good_standing()
                    && member.role.permits_insert(child_mime, &self.registry)
                {
                    return Ok(true);
                }
            }
        }

        tracing::debug!(%user, target = %target.id, child = %child_mime, "insert denied");
        Ok(false)
    }

    /// May `user` mutate `node`? Owners may while the node is still mutable;
    /// context owners may always, regardless of node ownership.
    pub async fn can_mutate(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<bool, AuthError> {
        let Some(user) = user else {
            return Ok(false);
        };
        if node.owned_by(user) && node.mutable {
            return Ok(true);
        }
        self.owns_context(Some(user), node).await
    }

    /// May `user` delete `node`? Same rule as mutation.
    pub async fn can_delete(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<bool, AuthError> {
        self.can_mutate(user, node).await
    }

    /// Whether `node` appears in default listings for `user`.
    ///
    /// Hidden descriptors exclude a node from enumeration for everyone but
    /// its owner and the context owner. This governs listings only; direct
    /// navigation by path is not blocked here.
    pub async fn can_read(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<bool, AuthError> {
        let hidden = self
            .registry
            .describe(&node.mime_id)
            .map(|descriptor| descriptor.hidden)
            .unwrap_or(false);
        if !hidden {
            return Ok(true);
        }
        let Some(user) = user else {
            return Ok(false);
        };
        if node.owned_by(user) {
            return Ok(true);
        }
        self.owns_context(Some(user), node).await
    }

    /// Children of `parent` as `user` sees them in a default listing.
    pub async fn visible_children(
        &self,
        user: Option<UserId>,
        parent: Option<NodeId>,
    ) -> Result<Vec<Node>, AuthError> {
        let children = self.store.children(parent).await?;
        let mut visible = Vec::with_capacity(children.len());
        for child in children {
            if self.can_read(user, &child).await? {
                visible.push(child);
            }
        }
        Ok(visible)
    }

    /// Like [`Acl::can_insert`] but distinguishing a missing session from a
    /// denial.
    pub async fn require_insert(
        &self,
        user: Option<UserId>,
        target: &Node,
        child_mime: &MimeId,
    ) -> Result<UserId, AuthError> {
        let user = user.ok_or(AuthError::Unauthenticated)?;
        if self.can_insert(Some(user), target, child_mime).await? {
            Ok(user)
        } else {
            Err(AuthError::PermissionDenied)
        }
    }

    /// Like [`Acl::can_mutate`] but distinguishing a missing session from a
    /// denial.
    pub async fn require_mutate(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<UserId, AuthError> {
        let user = user.ok_or(AuthError::Unauthenticated)?;
        if self.can_mutate(Some(user), node).await? {
            Ok(user)
        } else {
            Err(AuthError::PermissionDenied)
        }
    }

    /// Require that `user` owns the context enclosing `node`.
    pub async fn require_context_owner(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<UserId, AuthError> {
        let user = user.ok_or(AuthError::Unauthenticated)?;
        if self.owns_context(Some(user), node).await? {
            Ok(user)
        } else {
            Err(AuthError::PermissionDenied)
        }
    }

    /// Require that `user` administers the context enclosing `node`.
    pub async fn require_admin(
        &self,
        user: Option<UserId>,
        node: &Node,
    ) -> Result<UserId, AuthError> {
        let user = user.ok_or(AuthError::Unauthenticated)?;
        if self.is_admin(Some(user), node).await? {
            Ok(user)
        } else {
            Err(AuthError::PermissionDenied)
        }
    }
}
