// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types for the plenum content tree.
//!
//! Everything an assembly works with is a [`Node`]: folders, documents,
//! groups, events, polls, ballots and speaker-queue entries. Nodes form an
//! arbitrarily nested tree addressed by slash-separated key paths, and every
//! node carries a string "mime" tag which determines its behaviour. The tag
//! is data, not a compiled enumeration, so all dispatch over it is total:
//! unknown tags fold into a fallback variant instead of failing.
//!
//! This crate is free of I/O and async concerns; persistence lives in
//! `plenum-store` and evaluation logic in `plenum-auth` and `plenum-engine`.

pub mod identity;
pub mod member;
pub mod mime;
pub mod node;
pub mod payload;
pub mod variant;

pub use identity::{NodeId, UserId};
pub use member::{Member, Role};
pub use mime::{MimeDescriptor, MimeId, Registry, UnknownMime};
pub use node::Node;
pub use payload::{
    BallotPayload, PayloadError, PollPayload, SpeakPayload, SpeakerlistPayload,
};
pub use variant::Variant;
