// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mime tags and the static descriptor registry.
//!
//! A node's mime tag decides its visibility, which children it accepts,
//! whether it scopes a permission context and whether foreign content may be
//! attached to it. The registry is the safe boundary for extensibility:
//! descriptors for new tags can be registered at startup without touching
//! dispatch code, and lookups for tags nobody registered fail with
//! [`UnknownMime`] which callers must fold into the fallback variant rather
//! than surface to end users.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// String type tag of a node, for example `"wiki/folder"` or `"vote/poll"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeId(String);

impl MimeId {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MimeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well-known mime tags.
pub const HOME: &str = "wiki/home";
pub const FOLDER: &str = "wiki/folder";
pub const DOCUMENT: &str = "wiki/document";
pub const FILE: &str = "wiki/file";
pub const MAP: &str = "geo/map";
pub const GROUP: &str = "org/group";
pub const EVENT: &str = "org/event";
pub const USER: &str = "org/user";
pub const POLICY_VOTE: &str = "vote/policy";
pub const POSITION_VOTE: &str = "vote/position";
pub const CANDIDATE_VOTE: &str = "vote/candidate";
pub const POLL: &str = "vote/poll";
pub const BALLOT: &str = "vote/vote";
pub const SPEAKERLIST: &str = "list/speaker";
pub const SPEAK: &str = "list/speak";

/// Static behaviour description of a mime tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MimeDescriptor {
    /// Excluded from default child listings for everyone but the node owner
    /// and the context owner. Does not block direct navigation by path.
    pub hidden: bool,

    /// Mime tags permitted as children of nodes carrying this tag.
    pub insertable_children: &'static [&'static str],

    /// Nodes of this tag scope a membership-based permission domain.
    pub is_context: bool,

    /// Foreign content may be appended while the node is mutable, even by
    /// users who own neither the node nor its context.
    pub attachable: bool,
}

impl MimeDescriptor {
    const fn plain(insertable_children: &'static [&'static str]) -> Self {
        Self {
            hidden: false,
            insertable_children,
            is_context: false,
            attachable: false,
        }
    }

    const fn context(insertable_children: &'static [&'static str]) -> Self {
        Self {
            hidden: false,
            insertable_children,
            is_context: true,
            attachable: false,
        }
    }

    /// Whether `child` appears in this descriptor's insertable set.
    pub fn allows_child(&self, child: &MimeId) -> bool {
        self.insertable_children
            .iter()
            .any(|tag| *tag == child.as_str())
    }
}

const HOME_CHILDREN: &[&str] = &[FOLDER, DOCUMENT, MAP, GROUP, EVENT];
const CONTENT_CHILDREN: &[&str] = &[FOLDER, DOCUMENT, FILE, MAP];
const CONTEXT_CHILDREN: &[&str] = &[
    FOLDER,
    DOCUMENT,
    FILE,
    MAP,
    EVENT,
    POLICY_VOTE,
    POSITION_VOTE,
    CANDIDATE_VOTE,
    POLL,
    SPEAKERLIST,
];

/// Lookup failed because no descriptor was registered for a tag.
///
/// Mime tags are data and new ones may appear without a code release, so
/// callers treat this as the fallback/unknown case, never as an error state
/// shown to the end user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no descriptor registered for mime tag '{0}'")]
pub struct UnknownMime(pub MimeId);

/// Total lookup table from mime tags to their descriptors.
#[derive(Clone, Debug)]
pub struct Registry {
    table: HashMap<&'static str, MimeDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self {
            table: HashMap::new(),
        };

        registry.register(HOME, MimeDescriptor::plain(HOME_CHILDREN));
        registry.register(FOLDER, MimeDescriptor::plain(CONTENT_CHILDREN));
        registry.register(DOCUMENT, MimeDescriptor::plain(&[FILE]));
        registry.register(FILE, MimeDescriptor::plain(&[]));
        registry.register(MAP, MimeDescriptor::plain(&[]));
        registry.register(USER, MimeDescriptor::plain(&[]));

        registry.register(GROUP, MimeDescriptor::context(CONTEXT_CHILDREN));
        registry.register(EVENT, MimeDescriptor::context(CONTEXT_CHILDREN));

        registry.register(POLICY_VOTE, MimeDescriptor::plain(&[POLL]));
        registry.register(POSITION_VOTE, MimeDescriptor::plain(&[POLL]));
        registry.register(CANDIDATE_VOTE, MimeDescriptor::plain(&[POLL]));

        // Polls and speaker lists accept appended foreign content (ballots,
        // speak requests) while they are open.
        registry.register(
            POLL,
            MimeDescriptor {
                hidden: false,
                insertable_children: &[BALLOT],
                is_context: false,
                attachable: true,
            },
        );
        registry.register(
            BALLOT,
            MimeDescriptor {
                hidden: true,
                insertable_children: &[],
                is_context: false,
                attachable: false,
            },
        );
        registry.register(
            SPEAKERLIST,
            MimeDescriptor {
                hidden: false,
                insertable_children: &[SPEAK],
                is_context: false,
                attachable: true,
            },
        );
        registry.register(SPEAK, MimeDescriptor::plain(&[]));

        registry
    }
}

impl Registry {
    /// Register a descriptor, replacing any previous registration of the tag.
    pub fn register(&mut self, tag: &'static str, descriptor: MimeDescriptor) {
        self.table.insert(tag, descriptor);
    }

    /// Look up the descriptor of a mime tag.
    pub fn describe(&self, mime: &MimeId) -> Result<&MimeDescriptor, UnknownMime> {
        self.table
            .get(mime.as_str())
            .ok_or_else(|| UnknownMime(mime.clone()))
    }

    /// Whether a node tagged `parent` accepts children tagged `child`.
    ///
    /// Unknown parents accept nothing, unknown children are never accepted.
    pub fn insertable(&self, parent: &MimeId, child: &MimeId) -> bool {
        match self.describe(parent) {
            Ok(descriptor) => self.describe(child).is_ok() && descriptor.allows_child(child),
            Err(UnknownMime(_)) => false,
        }
    }
}
