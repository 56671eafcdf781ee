// SPDX-License-Identifier: MIT OR Apache-2.0

//! Navigation, lifecycle and timing engine for the plenum content tree.
//!
//! This crate layers the application's behaviour over the store and the
//! permission evaluator: resolving slash-separated paths to nodes, the
//! draft/published and open/closed state machines, ballot casting, speaker
//! queues and the clock-skew-corrected countdown shared by all connected
//! clients.
//!
//! Everything here is a thin, disposable view over the authoritative store:
//! mutations are fire-and-forget, pushes replace local state wholesale, and
//! an abandoned navigation simply drops its in-flight futures.

pub mod content;
pub mod countdown;
pub mod error;
pub mod lifecycle;
pub mod path;
pub mod resolver;
pub mod session;
pub mod speaker;

pub use content::Content;
pub use countdown::{remaining_seconds, ClockSync, Countdown};
pub use error::EngineError;
pub use lifecycle::Lifecycle;
pub use path::{parse_path, Presentation};
pub use resolver::{ResolveError, ResolvedChain, Resolver};
pub use session::Session;
pub use speaker::SpeakerQueue;
