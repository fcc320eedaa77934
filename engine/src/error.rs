use crate::models::OptionRight;
use thiserror::Error;

/// Reasons a strategy's legs cannot be built or profiled from a chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("spot price is missing or not positive")]
    MissingSpot,

    #[error("no {0} rows in option chain")]
    EmptySide(OptionRight),

    #[error("no {right} strike {description} {target:.2}")]
    NoStrikeInBand {
        right: OptionRight,
        description: &'static str,
        target: f64,
    },

    #[error("no premium available for {right} strike {strike:.2}")]
    MissingPremium { right: OptionRight, strike: f64 },

    #[error("net premium {net:.4} has the wrong sign for this structure")]
    NonPositiveNetPremium { net: f64 },

    #[error("no put listed at call strike {strike:.2}")]
    StraddleStrikeMismatch { strike: f64 },

    #[error("expected {expected} legs, got {actual}")]
    UnexpectedLegCount { expected: usize, actual: usize },
}
