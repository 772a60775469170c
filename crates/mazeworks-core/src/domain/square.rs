//! Square labels as they appear in unique square sets and permutations.
//!
//! Labels are persisted as strings (`normal`, `barrier`, `bridge`,
//! `endpoint_1_a`, `tunnel_2_b`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which half of a paired square this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

/// Paired square kinds. Each group `n` has exactly one `_a` and one `_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairKind {
    Endpoint,
    Portal,
    Tunnel,
}

impl PairKind {
    fn prefix(self) -> &'static str {
        match self {
            PairKind::Endpoint => "endpoint",
            PairKind::Portal => "portal",
            PairKind::Tunnel => "tunnel",
        }
    }
}

/// One cell's label.
///
/// The derived ordering is only used to walk distinct orderings of a
/// multiset; it carries no domain meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Label {
    Normal,
    Barrier,
    Bridge,
    Paired { kind: PairKind, group: u8, side: Side },
}

impl Label {
    pub fn endpoint(group: u8, side: Side) -> Self {
        Label::Paired {
            kind: PairKind::Endpoint,
            group,
            side,
        }
    }

    pub fn tunnel(group: u8, side: Side) -> Self {
        Label::Paired {
            kind: PairKind::Tunnel,
            group,
            side,
        }
    }

    pub fn portal(group: u8, side: Side) -> Self {
        Label::Paired {
            kind: PairKind::Portal,
            group,
            side,
        }
    }

    pub fn is_normal(self) -> bool {
        self == Label::Normal
    }

    /// The label of this square's partner, for paired squares.
    pub fn partner(self) -> Option<Label> {
        match self {
            Label::Paired { kind, group, side } => Some(Label::Paired {
                kind,
                group,
                side: side.other(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Normal => f.write_str("normal"),
            Label::Barrier => f.write_str("barrier"),
            Label::Bridge => f.write_str("bridge"),
            Label::Paired { kind, group, side } => {
                write!(f, "{}_{}_{}", kind.prefix(), group, side.suffix())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid square label: {0}")]
pub struct InvalidLabel(pub String);

impl FromStr for Label {
    type Err = InvalidLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => return Ok(Label::Normal),
            "barrier" => return Ok(Label::Barrier),
            "bridge" => return Ok(Label::Bridge),
            _ => {}
        }

        let invalid = || InvalidLabel(s.to_string());
        let mut parts = s.split('_');
        let kind = match parts.next() {
            Some("endpoint") => PairKind::Endpoint,
            Some("portal") => PairKind::Portal,
            Some("tunnel") => PairKind::Tunnel,
            _ => return Err(invalid()),
        };
        let group: u8 = parts
            .next()
            .and_then(|g| g.parse().ok())
            .filter(|g| *g > 0)
            .ok_or_else(invalid)?;
        let side = match parts.next() {
            Some("a") => Side::A,
            Some("b") => Side::B,
            _ => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Label::Paired { kind, group, side })
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

impl TryFrom<String> for Label {
    type Error = InvalidLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
