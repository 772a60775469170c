//! Per-type numeric ranges loaded from settings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ConfigError, ExtraKind, MazeType};
use crate::ports::Store;

/// Inclusive `[min, max]` range. `min > max` is an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: u32,
    pub max: u32,
}

impl Range {
    pub const NOT_ALLOWED: Range = Range { min: 0, max: 0 };

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn values(self) -> std::ops::RangeInclusive<u32> {
        self.min..=self.max
    }

    pub fn is_not_allowed(self) -> bool {
        self == Range::NOT_ALLOWED
    }
}

/// "between A and B", or "not allowed" for `[0, 0]`.
impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_not_allowed() {
            f.write_str("not allowed")
        } else {
            write!(f, "between {} and {}", self.min, self.max)
        }
    }
}

/// Every range that constrains formulas of one maze type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRanges {
    pub maze_type: MazeType,
    pub x: Range,
    pub y: Range,
    pub endpoints: Range,
    pub barriers: Range,
    pub bridges: Range,
    pub tunnels: Range,
    pub portals: Range,
}

impl TypeRanges {
    /// Reads `<type>_x_min` .. `<type>_barrier_max` and the type's own
    /// extra-count range. Kinds the type does not support stay `[0, 0]`.
    pub fn load(store: &dyn Store, maze_type: MazeType) -> Result<Self, ConfigError> {
        let prefix = maze_type.as_str();
        let range = |field: &str| -> Result<Range, ConfigError> {
            Ok(Range::new(
                read(store, &format!("{prefix}_{field}_min"))?,
                read(store, &format!("{prefix}_{field}_max"))?,
            ))
        };

        let mut ranges = Self {
            maze_type,
            x: range("x")?,
            y: range("y")?,
            endpoints: range("endpoint")?,
            barriers: range("barrier")?,
            bridges: Range::NOT_ALLOWED,
            tunnels: Range::NOT_ALLOWED,
            portals: Range::NOT_ALLOWED,
        };
        if let Some(kind) = maze_type.extra() {
            let extra = Range::new(
                read(store, &format!("{}_min", kind.as_str()))?,
                read(store, &format!("{}_max", kind.as_str()))?,
            );
            *ranges.extra_mut(kind) = extra;
        }
        Ok(ranges)
    }

    pub fn extra(&self, kind: ExtraKind) -> Range {
        match kind {
            ExtraKind::Bridge => self.bridges,
            ExtraKind::Tunnel => self.tunnels,
            ExtraKind::Portal => self.portals,
        }
    }

    fn extra_mut(&mut self, kind: ExtraKind) -> &mut Range {
        match kind {
            ExtraKind::Bridge => &mut self.bridges,
            ExtraKind::Tunnel => &mut self.tunnels,
            ExtraKind::Portal => &mut self.portals,
        }
    }

    /// Range of the type's own extra count; `[0, 0]` for simple mazes.
    pub fn own_extra(&self) -> Range {
        self.maze_type
            .extra()
            .map_or(Range::NOT_ALLOWED, |kind| self.extra(kind))
    }
}

fn read(store: &dyn Store, name: &str) -> Result<u32, ConfigError> {
    let value = store
        .setting(name)?
        .ok_or_else(|| ConfigError::Missing(name.to_string()))?;
    u32::try_from(value).map_err(|_| ConfigError::OutOfRange {
        name: name.to_string(),
        value,
    })
}
