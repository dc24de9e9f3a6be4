//! Reasons the engine refuses a formation change.

use constellation_core::{ConstellationId, PatternKind};
use thiserror::Error;

/// Reasons a formation change was not committed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FormationRejection {
    /// The pattern is not registered.
    #[error("pattern {0} is not registered")]
    UnknownPattern(PatternKind),
    /// Too few eligible members were supplied.
    #[error("{pattern} needs {needed} members but only {available} are eligible")]
    NotEnoughMembers {
        /// Pattern that was attempted.
        pattern: PatternKind,
        /// Smallest member count the pattern accepts.
        needed: usize,
        /// Eligible members that were supplied.
        available: usize,
    },
    /// No registered pattern fits the member count.
    #[error("no pattern fits {0} members")]
    NoFittingPattern(usize),
    /// Members are spread wider than the maximum formation radius.
    #[error("members spread {spread:.1} units from their centroid, above {limit:.1}")]
    TooSpread {
        /// Largest member distance from the centroid.
        spread: f32,
        /// Maximum formation radius.
        limit: f32,
    },
    /// Target positions were missing or non-finite.
    #[error("pattern {0} produced unusable geometry")]
    InvalidGeometry(PatternKind),
    /// The constellation is not active.
    #[error("constellation {} is not active", .0.get())]
    UnknownConstellation(ConstellationId),
    /// The constellation is younger than the operation allows.
    #[error("constellation {} is {age:.1}s old, needs {required:.1}s", .id.get())]
    TooYoung {
        /// Constellation that was too young.
        id: ConstellationId,
        /// Its age in seconds.
        age: f32,
        /// Required age in seconds.
        required: f32,
    },
    /// The combined membership would not grow.
    #[error("no additional eligible members")]
    NoGrowth,
    /// Two formations are too far apart to merge.
    #[error("formations are {distance:.1} units apart, above {limit:.1}")]
    TooFar {
        /// Distance between the centers.
        distance: f32,
        /// Merge radius.
        limit: f32,
    },
}
