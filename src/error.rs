//! Ambient error type for the crate's fallible entry points, following the
//! teacher's pattern of a single `thiserror`-derived enum per crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PocketError {
    #[error("emit_options requests both CHORD and SMOOTH_CHORD; only one may be set")]
    ConflictingChordEmission,

    #[error("emit_options requests SMOOTH_CHORD but the mill direction is Unknown")]
    SmoothChordRequiresDirection,

    #[error("cutter_radius must be positive")]
    InvalidCutterRadius,

    #[error("max_engagement must be in (0, 1]")]
    InvalidMaxEngagement,

    #[error("min_engagement must be in [0, max_engagement)")]
    InvalidMinEngagement,
}
