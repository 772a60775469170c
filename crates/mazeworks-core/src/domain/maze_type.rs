//! Maze types and the special-square kinds they allow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The family a formula belongs to.
///
/// Every type allows endpoints and barriers; each non-simple type adds
/// exactly one extra special-square kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MazeType {
    Simple,
    Bridge,
    Tunnel,
    Portal,
}

/// The type-specific extra square counted by a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraKind {
    Bridge,
    Tunnel,
    Portal,
}

impl MazeType {
    pub const ALL: [MazeType; 4] = [
        MazeType::Simple,
        MazeType::Bridge,
        MazeType::Tunnel,
        MazeType::Portal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MazeType::Simple => "simple",
            MazeType::Bridge => "bridge",
            MazeType::Tunnel => "tunnel",
            MazeType::Portal => "portal",
        }
    }

    /// Human-readable name used in validation messages.
    pub fn title(self) -> &'static str {
        match self {
            MazeType::Simple => "Simple",
            MazeType::Bridge => "Bridge",
            MazeType::Tunnel => "Tunnel",
            MazeType::Portal => "Portal",
        }
    }

    /// The extra square kind this type supports, if any.
    pub fn extra(self) -> Option<ExtraKind> {
        match self {
            MazeType::Simple => None,
            MazeType::Bridge => Some(ExtraKind::Bridge),
            MazeType::Tunnel => Some(ExtraKind::Tunnel),
            MazeType::Portal => Some(ExtraKind::Portal),
        }
    }
}

impl ExtraKind {
    pub const ALL: [ExtraKind; 3] = [ExtraKind::Bridge, ExtraKind::Tunnel, ExtraKind::Portal];

    pub fn as_str(self) -> &'static str {
        match self {
            ExtraKind::Bridge => "bridge",
            ExtraKind::Tunnel => "tunnel",
            ExtraKind::Portal => "portal",
        }
    }

    /// Cells one unit of this kind occupies (tunnels and portals come in pairs).
    pub fn cells(self) -> u32 {
        match self {
            ExtraKind::Bridge => 1,
            ExtraKind::Tunnel | ExtraKind::Portal => 2,
        }
    }

    /// The maze type that owns this kind.
    pub fn maze_type(self) -> MazeType {
        match self {
            ExtraKind::Bridge => MazeType::Bridge,
            ExtraKind::Tunnel => MazeType::Tunnel,
            ExtraKind::Portal => MazeType::Portal,
        }
    }
}

impl fmt::Display for MazeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExtraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown maze type: {0}")]
pub struct UnknownMazeType(pub String);

impl FromStr for MazeType {
    type Err = UnknownMazeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MazeType::ALL
            .into_iter()
            .find(|maze_type| maze_type.as_str() == s)
            .ok_or_else(|| UnknownMazeType(s.to_string()))
    }
}
