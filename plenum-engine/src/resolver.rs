// SPDX-License-Identifier: MIT OR Apache-2.0

//! Path-to-node resolution.
//!
//! A path is resolved strictly left to right, one `(parent, key)` point
//! query per segment. Nothing is cached across navigations because keys and
//! hierarchy can change between sessions; within a single call the chain is
//! naturally reused as the walk progresses. Resolution is read-only, so an
//! abandoned navigation simply drops the future with no observable effect.

use plenum_core::NodeId;
use plenum_store::{NodeStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// A segment matched no node. The type dispatcher maps this to the
    /// fallback "unknown" presentation, not an error page.
    #[error("no node with key '{segment}' at depth {depth}")]
    NotFound { depth: usize, segment: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The fully resolved identifier chain of a path.
///
/// Available only when every segment resolved: resolution is fail-fast and
/// never commits a partial chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChain {
    ids: Vec<NodeId>,
}

impl ResolvedChain {
    /// Identifiers along the path, outermost first.
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// The resolved node, or `None` when the path addressed the tree root.
    pub fn target(&self) -> Option<NodeId> {
        self.ids.last().copied()
    }

    pub fn is_root(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolves slash-separated paths against the store.
#[derive(Clone, Debug)]
pub struct Resolver<S> {
    store: S,
}

impl<S> Resolver<S>
where
    S: NodeStore + Sync,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve the entire chain ahead of navigation.
    ///
    /// Identical semantics to [`Resolver::resolve`]; navigation commits only
    /// once the whole chain is available.
    pub async fn prefetch<T>(&self, segments: &[T]) -> Result<ResolvedChain, ResolveError>
    where
        T: AsRef<str> + Sync,
    {
        let mut ids = Vec::with_capacity(segments.len());
        let mut parent: Option<NodeId> = None;

        for (depth, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            match self.store.child_by_key(parent, segment).await? {
                Some(node) => {
                    parent = Some(node.id);
                    ids.push(node.id);
                }
                None => {
                    return Err(ResolveError::NotFound {
                        depth,
                        segment: segment.to_string(),
                    });
                }
            }
        }

        Ok(ResolvedChain { ids })
    }

    /// Resolve a path to its target node id.
    ///
    /// An empty segment list resolves to the tree root (`None`).
    pub async fn resolve<T>(&self, segments: &[T]) -> Result<Option<NodeId>, ResolveError>
    where
        T: AsRef<str> + Sync,
    {
        Ok(self.prefetch(segments).await?.target())
    }
}
