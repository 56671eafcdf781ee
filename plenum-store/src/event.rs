// SPDX-License-Identifier: MIT OR Apache-2.0

use plenum_core::{MimeId, Node, NodeId};

/// Change notification pushed to subscribers.
///
/// Events carry the full current state of the affected node, never a diff.
/// Subscribers must treat each event as a wholesale replacement of their
/// local view of that node.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    Changed(Node),
    Deleted(NodeId),
}

impl StoreEvent {
    /// Id of the node the event concerns.
    pub fn node_id(&self) -> NodeId {
        match self {
            StoreEvent::Changed(node) => node.id,
            StoreEvent::Deleted(id) => *id,
        }
    }
}

/// Filter over the store's event feed.
///
/// The store pushes one feed of all changes; clients narrow it down to the
/// nodes they currently render. Deletions carry only an id and therefore
/// match by-id filters only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionFilter {
    ById(NodeId),
    ByParent(Option<NodeId>),
    ByMime(MimeId),
}

impl SubscriptionFilter {
    pub fn matches(&self, event: &StoreEvent) -> bool {
        match (self, event) {
            (SubscriptionFilter::ById(id), event) => event.node_id() == *id,
            (SubscriptionFilter::ByParent(parent), StoreEvent::Changed(node)) => {
                node.parent_id == *parent
            }
            (SubscriptionFilter::ByMime(mime), StoreEvent::Changed(node)) => {
                node.mime_id == *mime
            }
            (_, StoreEvent::Deleted(_)) => false,
        }
    }
}
