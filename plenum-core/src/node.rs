// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{NodeId, UserId};
use crate::mime::{MimeId, Registry};
use crate::payload::PayloadError;
use crate::variant::Variant;

/// The universal entity of the content tree.
///
/// A node's `key` is its path segment, unique among siblings of the same
/// parent. `parent_id` is `None` only for top-level nodes. The `mime_id` is
/// immutable after creation; `mutable` transitions from `true` (draft, open)
/// to `false` (published, closed) and only administrative correction ever
/// flips it back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub key: String,
    pub name: String,
    pub mime_id: MimeId,
    /// Opaque structured payload; its shape is defined by `mime_id`.
    pub data: Value,
    pub mutable: bool,
    pub owner_id: Option<UserId>,
    /// Sibling ordering.
    pub index: i64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Node {
    /// Behaviour variant of this node, total over all mime tags.
    pub fn variant(&self) -> Variant {
        Variant::from_mime(&self.mime_id)
    }

    /// Whether this node scopes a membership-based permission domain.
    pub fn is_context(&self, registry: &Registry) -> bool {
        registry
            .describe(&self.mime_id)
            .map(|descriptor| descriptor.is_context)
            .unwrap_or(false)
    }

    /// Deserialize the payload into its typed shape.
    pub fn payload<T>(&self) -> Result<T, PayloadError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.data.clone()).map_err(PayloadError::Shape)
    }

    /// Whether `user` owns this node.
    pub fn owned_by(&self, user: UserId) -> bool {
        self.owner_id == Some(user)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::mime;
    use crate::payload::PollPayload;

    use super::*;

    fn poll_node() -> Node {
        Node {
            id: NodeId::from_raw(7),
            parent_id: Some(NodeId::from_raw(1)),
            key: "poll-1".to_string(),
            name: "Budget 2026".to_string(),
            mime_id: MimeId::from(mime::POLL),
            data: json!({
                "min_vote": 1,
                "max_vote": 1,
                "hidden": false,
                "options": ["yes", "no", "abstain"],
                "source_node_id": null,
            }),
            mutable: true,
            owner_id: Some(UserId::from_raw(3)),
            index: 0,
            created_at: 10,
            updated_at: 10,
        }
    }

    #[test]
    fn typed_payload_access() {
        let poll: PollPayload = poll_node().payload().expect("well-formed payload");
        assert_eq!(poll.options.len(), 3);
        assert_eq!(poll.max_vote, 1);
    }

    #[test]
    fn context_check_is_total() {
        let mut node = poll_node();
        node.mime_id = MimeId::from("no/such/tag");
        assert!(!node.is_context(&Registry::default()));
    }
}
