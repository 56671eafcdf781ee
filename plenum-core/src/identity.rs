// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque, server-assigned handle of a node.
///
/// Nodes refer to each other exclusively through ids (parent pointers,
/// active-poll pointers, clipboard selections), never through language-level
/// references, so the tree can be arbitrarily deep and "cyclic-looking"
/// without ownership issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Construct a node id from its raw representation.
    ///
    /// Ids are assigned by the store; this is only useful for adapters which
    /// receive ids over their backend boundary.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw representation of the id.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(value.parse()?))
    }
}

/// Opaque handle of a user.
///
/// Authentication and session issuance live outside this system; a `UserId`
/// is whatever identity the surrounding application established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
