//! crates/fd_pipeline/src/validate.rs
//! Input validation before any run.
//!
//! Every problem is collected; nothing stops at the first bad player.
//! Issues are sorted (where, then code, then message) so reports are stable.

use std::fmt;

use fd_core::{Params, PlayerId, RegionId, RegionSet};

use crate::session::InputSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityRef {
    Root,
    Player(PlayerId),
    Region(RegionId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub where_: EntityRef,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{sev} [{}] {}", self.code, self.message)
    }
}

/// pass = no Error-severity issue.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Checks the valuations of players `P1..=Pn` as handed out by `source`.
///
/// Errors:
/// - "Player.Missing" when a declared player has no valuation
/// - "Player.TotalOutOfTolerance" when a total is off by more than the tolerance
/// - "Player.NegativeValue" for a negative point value
///
/// Warnings:
/// - "Player.UnknownRegion" for points on a region the board does not have
/// - "Board.Empty" when no region is defined
pub fn validate_inputs<S: InputSource + ?Sized>(
    source: &S,
    player_count: usize,
    regions: &RegionSet,
    params: &Params,
) -> ValidationReport {
    let mut issues = Vec::new();

    if regions.is_empty() {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "Board.Empty",
            message: "no regions defined; every piece is worth 0".into(),
            where_: EntityRef::Root,
        });
    }

    for n in 1..=player_count {
        let player = PlayerId::numbered(n);
        let Some(valuation) = source.player_values(&player) else {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Player.Missing",
                message: format!("{player} has no valuation"),
                where_: EntityRef::Player(player),
            });
            continue;
        };

        let total = valuation.total();
        if (total - params.valuation_total).abs() > params.valuation_tolerance {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Player.TotalOutOfTolerance",
                message: format!(
                    "{player} total is {total} (expected {} ± {})",
                    params.valuation_total, params.valuation_tolerance
                ),
                where_: EntityRef::Player(player.clone()),
            });
        }
        for (region, points) in valuation.iter() {
            if points < 0.0 {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    code: "Player.NegativeValue",
                    message: format!("{player} gives {region} a negative value ({points})"),
                    where_: EntityRef::Player(player.clone()),
                });
            }
            if !regions.contains(region) {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    code: "Player.UnknownRegion",
                    message: format!("{player} values {region}, which is not on the board"),
                    where_: EntityRef::Player(player.clone()),
                });
            }
        }
    }

    sort_issues_stably(&mut issues);
    ValidationReport {
        pass: !issues.iter().any(|i| i.severity == Severity::Error),
        issues,
    }
}

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.where_
            .cmp(&b.where_)
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.message.cmp(&b.message))
    });
}
