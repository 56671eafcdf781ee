// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed views over the opaque node payload.
//!
//! Node `data` is schemaless at the store boundary; each mime tag defines
//! the shape its payload is expected to have. These wrappers convert between
//! `serde_json::Value` and typed structs with forgiving defaults so that
//! payloads written by older releases keep deserializing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::identity::NodeId;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload does not have the expected shape: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("payload could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Payload of a `vote/poll` node.
///
/// A poll is created as a snapshot of its source node's option set at start
/// time; later edits of the source do not leak into a running poll. The
/// `voters` aggregate is written exactly once, atomically with closing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollPayload {
    #[serde(default = "default_min_vote")]
    pub min_vote: u32,
    #[serde(default = "default_max_vote")]
    pub max_vote: u32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub source_node_id: Option<NodeId>,
    /// Final distinct-voter count, present only on closed polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voters: Option<u64>,
}

const fn default_min_vote() -> u32 {
    1
}

const fn default_max_vote() -> u32 {
    1
}

impl PollPayload {
    pub fn snapshot(options: Vec<String>, source_node_id: Option<NodeId>) -> Self {
        Self {
            min_vote: default_min_vote(),
            max_vote: default_max_vote(),
            hidden: false,
            options,
            source_node_id,
            voters: None,
        }
    }

    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(PayloadError::Serialize)
    }
}

/// Payload of a `vote/vote` ballot: the selected option indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallotPayload {
    pub options: Vec<usize>,
}

impl BallotPayload {
    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(PayloadError::Serialize)
    }
}

/// Payload of a `list/speaker` node: the allotted seconds of the current
/// turn. The countdown engine derives the remaining time from this value
/// and the node's `updated_at` timestamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerlistPayload {
    #[serde(default)]
    pub time: u64,
}

impl SpeakerlistPayload {
    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(PayloadError::Serialize)
    }
}

/// Payload of a `list/speak` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeakPayload {
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

impl SpeakPayload {
    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(PayloadError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn poll_payload_defaults_apply() {
        let payload: PollPayload =
            serde_json::from_value(json!({ "options": ["a", "b"] })).expect("deserializes");
        assert_eq!(payload.min_vote, 1);
        assert_eq!(payload.max_vote, 1);
        assert_eq!(payload.voters, None);
    }

    #[test]
    fn voters_only_serialized_when_present() {
        let open = PollPayload::snapshot(vec!["a".into()], None);
        let value = open.to_value().expect("serializes");
        assert!(value.get("voters").is_none());

        let closed = PollPayload {
            voters: Some(12),
            ..open
        };
        let value = closed.to_value().expect("serializes");
        assert_eq!(value["voters"], json!(12));
    }

    #[test]
    fn speakerlist_payload_tolerates_empty_objects() {
        let payload: SpeakerlistPayload =
            serde_json::from_value(json!({})).expect("deserializes");
        assert_eq!(payload.time, 0);
    }
}
