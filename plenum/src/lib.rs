// SPDX-License-Identifier: MIT OR Apache-2.0

//! Umbrella crate bundling the plenum stack.
//!
//! A plenum deployment is a tree of typed nodes (documents, folders, polls,
//! speaker lists) governed by per-context membership and a deny-by-default
//! permission model. The pieces live in their own crates and are re-exported
//! here under one namespace:
//!
//! - [`plenum_core`]: node, mime registry and payload types
//! - [`plenum_store`]: the storage traits, the in-memory store and change
//!   feeds
//! - [`plenum_auth`]: the permission evaluator
//! - [`plenum_engine`]: path resolution, content guards, poll and speaker
//!   lifecycles and the client countdown

pub use plenum_auth;
pub use plenum_core;
pub use plenum_engine;
pub use plenum_store;

#[cfg(feature = "test_utils")]
pub mod test_utils;
