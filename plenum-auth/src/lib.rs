// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission evaluation for the plenum content tree.
//!
//! Every node lives under at most one *context*: the nearest ancestor
//! (including itself) whose mime descriptor marks it as a permission domain.
//! Context owners hold all rights within their context; memberships grant a
//! strict subset of them. The default policy is deny: absence of an explicit
//! grant is a denial, never an implicit allow.

pub mod acl;
pub mod error;

pub use acl::Acl;
pub use error::{AuthError, PublicError};
