// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-client session state.
//!
//! A session tracks the authenticated user, the clipboard of selected
//! nodes, the clock offset against the server and the path the client is
//! currently looking at. Navigation goes through the resolver; the stored
//! path only moves when the whole new path resolved.

use plenum_core::{NodeId, UserId};
use plenum_store::NodeStore;

use crate::countdown::ClockSync;
use crate::path::{parse_path, Presentation};
use crate::resolver::{ResolveError, Resolver};

#[derive(Clone, Debug, Default)]
pub struct Session {
    user: Option<UserId>,
    clipboard: Vec<NodeId>,
    clock: Option<ClockSync>,
    prefix: Vec<String>,
}

impl Session {
    pub fn new(user: Option<UserId>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn user(&self) -> Option<UserId> {
        self.user
    }

    pub fn authenticate(&mut self, user: UserId) {
        self.user = Some(user);
    }

    /// The path segments of the client's current location.
    pub fn location(&self) -> &[String] {
        &self.prefix
    }

    /// Toggle `id` in the clipboard selection.
    pub fn toggle_select(&mut self, id: NodeId) {
        match self.clipboard.iter().position(|selected| *selected == id) {
            Some(position) => {
                self.clipboard.remove(position);
            }
            None => self.clipboard.push(id),
        }
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.clipboard
    }

    pub fn clear_selection(&mut self) {
        self.clipboard.clear();
    }

    /// Establish the clock offset from one observed timestamp pair.
    pub fn sync_clock(&mut self, server_now: u64, local_now: u64) {
        self.clock = Some(ClockSync::establish(server_now, local_now));
    }

    pub fn clock(&self) -> Option<&ClockSync> {
        self.clock.as_ref()
    }

    /// Move the session to `path`.
    ///
    /// On success the session's location becomes the new path and the
    /// resolved target is returned together with the requested
    /// presentation. On failure the previous location is kept, so a typo
    /// in the address bar never strands the client.
    pub async fn navigate<S>(
        &mut self,
        resolver: &Resolver<S>,
        path: &str,
    ) -> Result<(Option<NodeId>, Presentation), ResolveError>
    where
        S: NodeStore + Send + Sync,
    {
        let (segments, presentation) = parse_path(path);
        let chain = resolver.prefetch(&segments).await?;
        self.prefix = segments;
        Ok((chain.target(), presentation))
    }
}
