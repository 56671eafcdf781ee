// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces and implementations of the persistence boundary for the plenum
//! content tree.
//!
//! The store is the sole arbiter of ordering for concurrent writers; clients
//! are thin, disposable views over it. Any backend offering point and
//! filtered queries, single-record mutations, the one compound poll swap and
//! full-snapshot change subscriptions is substitutable behind the trait
//! pair defined here.
//!
//! ## Atomic compound writes
//!
//! Multi-step writes that must strictly all occur or none occur are exposed
//! as one store-level operation, never as several client-issued calls. The
//! only such operation in this system is [`swapping the active
//! poll`](traits::LocalNodeStore::swap_active_poll): closing the previous
//! poll (writing its final voter aggregate and flipping it immutable) and
//! opening its successor must be one observable transition.
//!
//! ## Subscriptions
//!
//! Every mutation is pushed to subscribers as a full current-state snapshot
//! of the affected node. Subscribers replace their local view wholesale;
//! events are never diffs.

pub mod event;
pub mod memory;
pub mod retry;
pub mod traits;

pub use event::{StoreEvent, SubscriptionFilter};
pub use memory::MemoryStore;
pub use retry::Retry;
pub use traits::{
    ClosedPoll, LocalMemberStore, LocalNodeStore, MemberStore, NewNode, NodeStore, PollSwap,
    StoreError,
};
