//! Request parameters for the catalog endpoints.

use std::fmt;
use std::str::FromStr;

/// Queries shorter than this return an empty result without a request.
pub const MIN_SEARCH_QUERY_LEN: usize = 3;

/// `GET /v1/me/top/{kind}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopItemKind {
    Tracks,
    Artists,
}

impl TopItemKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            TopItemKind::Tracks => "tracks",
            TopItemKind::Artists => "artists",
        }
    }
}

impl FromStr for TopItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tracks" => Ok(TopItemKind::Tracks),
            "artists" => Ok(TopItemKind::Artists),
            other => Err(format!("unknown top item kind: {}", other)),
        }
    }
}

impl fmt::Display for TopItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Second result type of a search. Tracks are always included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Artist,
    Track,
    Album,
}

impl SearchKind {
    pub fn api_type(&self) -> &'static str {
        match self {
            SearchKind::Artist => "artist",
            SearchKind::Track => "track",
            SearchKind::Album => "album",
        }
    }

    /// Value of the `type` query parameter.
    pub fn search_types(&self) -> String {
        match self {
            SearchKind::Track => "track".to_string(),
            other => format!("track,{}", other.api_type()),
        }
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "artist" | "band" => Ok(SearchKind::Artist),
            "track" | "song" => Ok(SearchKind::Track),
            "album" => Ok(SearchKind::Album),
            other => Err(format!("unknown search kind: {}", other)),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_type())
    }
}
