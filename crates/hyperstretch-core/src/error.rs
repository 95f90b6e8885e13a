//! Error types for strict parameter validation.
//!
//! The engine itself never fails: out-of-range input is clamped by
//! [`StretchParameters::normalized`](crate::StretchParameters::normalized).
//! Callers that want to reject bad input instead of clamping it run
//! [`StretchParameters::validate`](crate::StretchParameters::validate) first.

use thiserror::Error;

/// Reasons a parameter set fails strict validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    /// A field holds NaN or an infinity.
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// A field lies outside its declared bounds.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The protection breakpoints are not ordered `LP <= SP <= HP`.
    #[error("breakpoints must satisfy LP <= SP <= HP, got LP={lp}, SP={sp}, HP={hp}")]
    UnorderedBreakpoints { lp: f64, sp: f64, hp: f64 },

    /// The linear stretch black point is not below the white point.
    #[error("black point {black} must be below white point {white}")]
    BlackAboveWhite { black: f64, white: f64 },
}
