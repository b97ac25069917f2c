//! Error type shared by the core components.

use thiserror::Error;

/// Errors produced by `seaway-core`.
///
/// Metric computations are total and never fail; only request validation and
/// route search surface errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeawayError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("invalid speed: {0} knots")]
    InvalidSpeed(f64),

    #[error("no metrics selected")]
    EmptyMetricSelection,

    #[error("no route found ({expanded} nodes expanded)")]
    NoRouteFound { expanded: usize },

    #[error("route search cancelled after {expanded} nodes expanded")]
    SearchCancelled { expanded: usize },
}

impl SeawayError {
    /// `true` for caller mistakes that should never be retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SeawayError::InvalidCoordinates(_)
                | SeawayError::InvalidSpeed(_)
                | SeawayError::EmptyMetricSelection
        )
    }
}

pub type SeawayResult<T> = Result<T, SeawayError>;
