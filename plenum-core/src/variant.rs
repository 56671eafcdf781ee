// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::mime::{self, MimeId};

/// Behaviour variant of a resolved node.
///
/// This is the closed set of presentations the application knows how to
/// render and operate on. Selection from a mime tag is a total function:
/// tags are data and new ones may be introduced without a code release, so
/// anything unrecognised dispatches to [`Variant::Unknown`] instead of
/// failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Folder,
    Document,
    File,
    Group,
    Event,
    User,
    PolicyVote,
    PositionVote,
    CandidateVote,
    Poll,
    Map,
    Home,
    Speakerlist,
    Unknown,
}

impl Variant {
    /// Select the variant for a mime tag.
    pub fn from_mime(mime: &MimeId) -> Self {
        match mime.as_str() {
            mime::FOLDER => Variant::Folder,
            mime::DOCUMENT => Variant::Document,
            mime::FILE => Variant::File,
            mime::GROUP => Variant::Group,
            mime::EVENT => Variant::Event,
            mime::USER => Variant::User,
            mime::POLICY_VOTE => Variant::PolicyVote,
            mime::POSITION_VOTE => Variant::PositionVote,
            mime::CANDIDATE_VOTE => Variant::CandidateVote,
            mime::POLL => Variant::Poll,
            mime::MAP => Variant::Map,
            mime::HOME => Variant::Home,
            mime::SPEAKERLIST => Variant::Speakerlist,
            _ => Variant::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_tags_dispatch() {
        assert_eq!(Variant::from_mime(&MimeId::from("wiki/folder")), Variant::Folder);
        assert_eq!(Variant::from_mime(&MimeId::from("vote/poll")), Variant::Poll);
        assert_eq!(Variant::from_mime(&MimeId::from("org/event")), Variant::Event);
    }

    #[test]
    fn unrecognised_tags_fall_back() {
        assert_eq!(Variant::from_mime(&MimeId::from("")), Variant::Unknown);
        assert_eq!(
            Variant::from_mime(&MimeId::from("vote/poll-v2")),
            Variant::Unknown
        );
    }
}
