// SPDX-License-Identifier: MIT OR Apache-2.0

/// Alternate presentation of a resolved node.
///
/// Selected by the `app` query parameter of a navigable path; it changes how
/// the node renders, never which node resolves. Unknown values fall back to
/// the default presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Presentation {
    #[default]
    Default,
    Member,
    Editor,
    Screen,
}

impl Presentation {
    fn from_app(app: Option<&str>) -> Self {
        match app {
            Some("member") => Presentation::Member,
            Some("editor") => Presentation::Editor,
            Some("screen") => Presentation::Screen,
            _ => Presentation::Default,
        }
    }
}

/// Split a navigable path `/seg1/seg2[?app=<variant>]` into its segments and
/// the requested presentation.
///
/// Empty segments collapse, so `//a//b/` parses the same as `/a/b`. An empty
/// segment list addresses the tree root.
pub fn parse_path(path: &str) -> (Vec<String>, Presentation) {
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };

    let app = query.and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("app="))
    });

    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    (segments, Presentation::from_app(app))
}
