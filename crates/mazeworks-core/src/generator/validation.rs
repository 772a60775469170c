//! Formula validation as structured, per-field feedback.
//!
//! Validation never fails with an error: each field reports whether it is
//! valid and the message a form would show next to it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ranges::{Range, TypeRanges};
use crate::domain::{ExtraKind, Formula};

const LOOKS_GOOD: &str = "Looks good!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    X,
    Y,
    Endpoints,
    Barriers,
    Bridges,
    Tunnels,
    Portals,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::X,
        Field::Y,
        Field::Endpoints,
        Field::Barriers,
        Field::Bridges,
        Field::Tunnels,
        Field::Portals,
    ];

    fn extra(kind: ExtraKind) -> Field {
        match kind {
            ExtraKind::Bridge => Field::Bridges,
            ExtraKind::Tunnel => Field::Tunnels,
            ExtraKind::Portal => Field::Portals,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::X => "x",
            Field::Y => "y",
            Field::Endpoints => "endpoints",
            Field::Barriers => "barriers",
            Field::Bridges => "bridges",
            Field::Tunnels => "tunnels",
            Field::Portals => "portals",
        };
        f.write_str(name)
    }
}

/// Outcome for one field. `message` is `None` for fields a maze type does
/// not use and that were left at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub field: Field,
    pub valid: bool,
    pub message: Option<String>,
}

impl FieldValidation {
    fn valid(field: Field) -> Self {
        Self {
            field,
            valid: true,
            message: Some(LOOKS_GOOD.to_string()),
        }
    }

    fn invalid(field: Field, message: String) -> Self {
        Self {
            field,
            valid: false,
            message: Some(message),
        }
    }
}

/// Validation of a formula against its maze type's ranges.
pub struct FormulaValidation<'a> {
    formula: &'a Formula,
    ranges: &'a TypeRanges,
}

impl<'a> FormulaValidation<'a> {
    pub fn new(formula: &'a Formula, ranges: &'a TypeRanges) -> Self {
        Self { formula, ranges }
    }

    fn experiment(&self) -> bool {
        self.formula.experiment
    }

    pub fn x_valid(&self) -> bool {
        self.ranges.x.contains(self.formula.x) || self.experiment() && self.formula.x > 0
    }

    pub fn y_valid(&self) -> bool {
        self.ranges.y.contains(self.formula.y) || self.experiment() && self.formula.y > 0
    }

    pub fn endpoints_valid(&self) -> bool {
        self.ranges.endpoints.contains(self.formula.endpoints)
            || self.experiment() && self.formula.endpoints > 1
    }

    /// A single endpoint pair needs at least one barrier to be a puzzle.
    pub fn barriers_valid(&self) -> bool {
        let barriers = self.formula.barriers;
        if self.formula.endpoints == 1 {
            self.experiment() && barriers >= 1
                || Range::new(1, self.ranges.barriers.max).contains(barriers)
        } else {
            self.experiment() || self.ranges.barriers.contains(barriers)
        }
    }

    pub fn extra_valid(&self, kind: ExtraKind) -> bool {
        let count = self.formula.count_of(kind);
        if self.formula.maze_type.extra() == Some(kind) {
            self.ranges.extra(kind).contains(count) || self.experiment() && count > 0
        } else {
            count == 0
        }
    }

    /// Every field is within range (or experiment-relaxed).
    pub fn is_valid(&self) -> bool {
        self.x_valid()
            && self.y_valid()
            && self.endpoints_valid()
            && self.is_experiment_valid()
    }

    /// Only barriers and extra counts are checked.
    pub fn is_experiment_valid(&self) -> bool {
        self.barriers_valid() && ExtraKind::ALL.into_iter().all(|kind| self.extra_valid(kind))
    }

    pub fn fields(&self) -> Vec<FieldValidation> {
        let mut fields = vec![
            self.check(Field::X, self.x_valid(), || {
                format!("Width must be {}.", self.ranges.x)
            }),
            self.check(Field::Y, self.y_valid(), || {
                format!("Height must be {}.", self.ranges.y)
            }),
            self.check(Field::Endpoints, self.endpoints_valid(), || {
                if self.experiment() {
                    "Experiments must have at least 1 endpoint.".to_string()
                } else {
                    format!("Number of endpoints must be {}.", self.ranges.endpoints)
                }
            }),
            self.check(Field::Barriers, self.barriers_valid(), || {
                if self.formula.barriers == 0 && self.formula.endpoints == 1 {
                    "You must have at least 1 barrier if you have 1 endpoint.".to_string()
                } else {
                    format!("Number of barriers must be {}.", self.ranges.barriers)
                }
            }),
        ];
        for kind in ExtraKind::ALL {
            fields.push(self.extra_field(kind));
        }
        fields
    }

    fn check(&self, field: Field, valid: bool, message: impl FnOnce() -> String) -> FieldValidation {
        if valid {
            FieldValidation::valid(field)
        } else {
            FieldValidation::invalid(field, message())
        }
    }

    fn extra_field(&self, kind: ExtraKind) -> FieldValidation {
        let field = Field::extra(kind);
        let title = kind.maze_type().title();
        if self.formula.maze_type.extra() != Some(kind) {
            return if self.extra_valid(kind) {
                FieldValidation {
                    field,
                    valid: true,
                    message: None,
                }
            } else {
                FieldValidation::invalid(
                    field,
                    format!("{title} squares are only allowed on {kind} mazes."),
                )
            };
        }
        self.check(field, self.extra_valid(kind), || {
            if self.experiment() {
                format!("{title} experiments must have at least 1 {kind}.")
            } else {
                format!("Number of {kind}s must be {}.", self.ranges.extra(kind))
            }
        })
    }
}

/// The valid range of every field for one maze type, as shown next to a
/// formula form.
pub fn describe_ranges(ranges: &TypeRanges) -> Vec<(Field, String)> {
    Field::ALL
        .into_iter()
        .map(|field| {
            let range = match field {
                Field::X => ranges.x,
                Field::Y => ranges.y,
                Field::Endpoints => ranges.endpoints,
                Field::Barriers => ranges.barriers,
                Field::Bridges => ranges.bridges,
                Field::Tunnels => ranges.tunnels,
                Field::Portals => ranges.portals,
            };
            (field, range.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MazeType;
    use rstest::rstest;

    fn ranges(maze_type: MazeType) -> TypeRanges {
        let mut ranges = TypeRanges {
            maze_type,
            x: Range::new(3, 6),
            y: Range::new(2, 6),
            endpoints: Range::new(1, 3),
            barriers: Range::new(0, 3),
            bridges: Range::NOT_ALLOWED,
            tunnels: Range::NOT_ALLOWED,
            portals: Range::NOT_ALLOWED,
        };
        if maze_type == MazeType::Tunnel {
            ranges.tunnels = Range::new(1, 2);
        }
        ranges
    }

    fn message(validation: &FormulaValidation<'_>, field: Field) -> Option<String> {
        validation
            .fields()
            .into_iter()
            .find(|result| result.field == field)
            .and_then(|result| result.message)
    }

    #[test]
    fn formula_within_ranges_is_valid() {
        let formula = Formula::new(MazeType::Simple, 4, 4, 2, 1, 0);
        let ranges = ranges(MazeType::Simple);
        let validation = FormulaValidation::new(&formula, &ranges);
        assert!(validation.is_valid());
        assert!(validation.fields().iter().all(|field| field.valid));
        assert_eq!(message(&validation, Field::X).as_deref(), Some("Looks good!"));
        assert_eq!(message(&validation, Field::Bridges), None);
    }

    #[rstest]
    #[case::too_wide(Formula::new(MazeType::Simple, 9, 4, 2, 1, 0), Field::X, "Width must be between 3 and 6.")]
    #[case::single_endpoint_without_barrier(
        Formula::new(MazeType::Simple, 4, 4, 1, 0, 0),
        Field::Barriers,
        "You must have at least 1 barrier if you have 1 endpoint."
    )]
    #[case::too_many_barriers(
        Formula::new(MazeType::Simple, 4, 4, 2, 5, 0),
        Field::Barriers,
        "Number of barriers must be between 0 and 3."
    )]
    #[case::bridge_on_simple(
        Formula::from_counts(MazeType::Simple, 4, 4, 2, 1, 1, 0, 0),
        Field::Bridges,
        "Bridge squares are only allowed on bridge mazes."
    )]
    fn invalid_fields_explain_themselves(
        #[case] formula: Formula,
        #[case] field: Field,
        #[case] expected: &str,
    ) {
        let ranges = ranges(MazeType::Simple);
        let validation = FormulaValidation::new(&formula, &ranges);
        assert!(!validation.is_valid());
        assert_eq!(message(&validation, field).as_deref(), Some(expected));
    }

    #[test]
    fn experiments_relax_ranges() {
        let formula = Formula::new(MazeType::Tunnel, 12, 9, 4, 6, 5).experiment();
        let ranges = ranges(MazeType::Tunnel);
        let validation = FormulaValidation::new(&formula, &ranges);
        assert!(validation.is_valid());
        assert!(validation.is_experiment_valid());
    }

    #[test]
    fn experiments_still_need_endpoints_and_extras() {
        let formula = Formula::new(MazeType::Tunnel, 4, 4, 0, 1, 0).experiment();
        let ranges = ranges(MazeType::Tunnel);
        let validation = FormulaValidation::new(&formula, &ranges);
        assert!(!validation.is_valid());
        assert!(!validation.is_experiment_valid());
        assert_eq!(
            message(&validation, Field::Endpoints).as_deref(),
            Some("Experiments must have at least 1 endpoint.")
        );
        assert_eq!(
            message(&validation, Field::Tunnels).as_deref(),
            Some("Tunnel experiments must have at least 1 tunnel.")
        );
    }

    #[test]
    fn range_descriptions_mark_unsupported_kinds() {
        let described = describe_ranges(&ranges(MazeType::Tunnel));
        assert!(described.contains(&(Field::Tunnels, "between 1 and 2".to_string())));
        assert!(described.contains(&(Field::Portals, "not allowed".to_string())));
        assert!(described.contains(&(Field::X, "between 3 and 6".to_string())));
    }
}
