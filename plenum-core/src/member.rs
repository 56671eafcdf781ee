// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::identity::{NodeId, UserId};
use crate::mime::{MimeId, Registry};

/// Role of a member within a context.
///
/// Greater roles are assumed to contain all lower ones; ownership of the
/// context itself sits above every role and is not modelled here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// May read, never insert.
    Observer,

    /// May insert ordinary content, ballots and speak requests.
    Contributor,

    /// May insert anything the parent's descriptor allows, including nested
    /// contexts, and may administer polls and speaker queues.
    Moderator,
}

impl Role {
    /// Whether this role covers inserting a child of the given mime tag.
    ///
    /// The parent descriptor's insertable set is checked separately by the
    /// permission evaluator; this only decides whether the role itself
    /// reaches far enough. Unknown child tags are covered by nobody.
    pub fn permits_insert(&self, child: &MimeId, registry: &Registry) -> bool {
        let Ok(descriptor) = registry.describe(child) else {
            return false;
        };

        match self {
            Role::Observer => false,
            Role::Contributor => !descriptor.is_context,
            Role::Moderator => true,
        }
    }
}

/// Association of a user with a context node.
///
/// Created when a context owner invites a user; `accepted` flips true on
/// acceptance and `active` tracks current participation. Only memberships
/// which are both accepted and active grant any permission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub context_id: NodeId,
    pub user_id: UserId,
    pub accepted: bool,
    pub active: bool,
    pub role: Role,
}

impl Member {
    /// A fresh, not yet accepted invitation.
    pub fn invitation(context_id: NodeId, user_id: UserId, role: Role) -> Self {
        Self {
            context_id,
            user_id,
            accepted: false,
            active: true,
            role,
        }
    }

    /// Whether this membership currently grants anything at all.
    pub fn in_good_standing(&self) -> bool {
        self.accepted && self.active
    }
}
