//! Hyperstretch Core - Stretch transform engine
//!
//! This crate turns stretch parameters into a four-segment piecewise
//! transform over normalized pixel values, evaluates it, and compiles it
//! into a PixelMath-style expression for an external pixel processor.
//!
//! # Module Structure
//!
//! - `params` - Parameter record, bounds, normalization, canonical key
//! - `segment` - One piece of the transform (affine or curved kernel)
//! - `solver` - Coefficient solving for every stretch family, and inverses
//! - `evaluate` - Scalar and strided evaluation
//! - `expression` - Conditional-expression compiler
//! - `statistics` - Median/MAD statistics and screen transfer parameters
//! - `cache` - Recalculation cache keyed on the canonical key
//! - `lut` - 8-bit preview lookup tables

pub mod cache;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod lut;
pub mod params;
pub mod segment;
pub mod solver;
pub mod statistics;

pub use cache::StretchCache;
pub use error::ParameterError;
pub use evaluate::{evaluate, evaluate_range, StretchRange};
pub use expression::{compile, compile_with_symbol, CompiledExpression, PIXEL_SYMBOL};
pub use lut::{apply_stretch, StretchLut};
pub use params::{
    amount_to_stretch, Channel, ChannelSelection, NormalizedParameters, StretchFamily,
    StretchParameters,
};
pub use segment::{Segment, ShapeKind};
pub use solver::{
    solve, solve_normalized, Breakpoints, CoefficientSet, Direction, HyperbolicKind,
    MIN_INVERTIBLE_SLOPE,
};
pub use statistics::{mtf, ChannelStatistics, Rgb8Statistics, StatisticsProvider, StfParameters};

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::params::{AMOUNT_RANGE, INTENSITY_RANGE};
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1e-7;

    /// Strategy for the curved families.
    fn family_strategy() -> impl Strategy<Value = StretchFamily> {
        prop_oneof![
            Just(StretchFamily::GeneralizedHyperbolic),
            Just(StretchFamily::HistogramTransformation),
            Just(StretchFamily::Arcsinh),
        ]
    }

    /// Strategy for ordered protection breakpoints `LP <= SP <= HP`.
    fn breakpoints_strategy() -> impl Strategy<Value = (f64, f64, f64)> {
        (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(|(a, b, c)| {
            let mut points = [a, b, c];
            points.sort_by(f64::total_cmp);
            (points[0], points[1], points[2])
        })
    }

    /// Strategy for the intensity, with the sub-family boundaries pinned.
    fn intensity_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![
            INTENSITY_RANGE.0..=INTENSITY_RANGE.1,
            Just(-1.0),
            Just(0.0),
        ]
    }

    /// Strategy for curved-family parameter sets over the whole slider range.
    fn params_strategy() -> impl Strategy<Value = StretchParameters> {
        (
            family_strategy(),
            intensity_strategy(),
            AMOUNT_RANGE.0..=AMOUNT_RANGE.1,
            breakpoints_strategy(),
        )
            .prop_map(|(family, intensity, amount, (lp, sp, hp))| StretchParameters {
                family,
                intensity,
                amount,
                shadow_protect: lp,
                focus: sp,
                highlight_protect: hp,
                ..StretchParameters::default()
            })
    }

    proptest! {
        /// Property: The forward transform is nondecreasing on [0, 1].
        #[test]
        fn prop_forward_is_monotonic(params in params_strategy()) {
            let set = solve(&params);
            let values = set.evaluate_range(0.0, 1.0 / 256.0, 257);
            for pair in values.windows(2) {
                prop_assert!(
                    pair[1] >= pair[0] - TOLERANCE,
                    "{} decreases: {} -> {}",
                    params.canonical_key(),
                    pair[0],
                    pair[1]
                );
            }
        }

        /// Property: The forward transform maps 0 to 0 and 1 to 1.
        #[test]
        fn prop_forward_fixes_endpoints(params in params_strategy()) {
            let set = solve(&params);
            prop_assert!(set.evaluate(0.0).abs() < TOLERANCE);
            prop_assert!((set.evaluate(1.0) - 1.0).abs() < TOLERANCE);
        }

        /// Property: Adjacent segments agree at every breakpoint.
        #[test]
        fn prop_forward_is_continuous(params in params_strategy()) {
            let set = solve(&params);
            let bp = set.breakpoints;
            for (i, x) in [bp.lpt, bp.spt, bp.hpt].into_iter().enumerate() {
                let left = set.segments[i].evaluate(x);
                let right = set.segments[i + 1].evaluate(x);
                prop_assert!(
                    (left - right).abs() < TOLERANCE,
                    "jump at breakpoint {}: {} vs {}",
                    i,
                    left,
                    right
                );
            }
        }

        /// Property: A true inverse undoes the forward transform.
        #[test]
        fn prop_true_inverse_round_trips(
            params in params_strategy(),
            x in 0.0f64..=1.0,
        ) {
            let forward = solve(&params);
            let inverse = solve(&StretchParameters { invert: true, ..params.clone() });
            prop_assume!(inverse.is_true_inverse);

            let y = forward.evaluate(x);
            let back = inverse.evaluate(y);
            prop_assert!(
                (back - x).abs() < 1e-6,
                "{}: {} -> {} -> {}",
                params.canonical_key(),
                x,
                y,
                back
            );
        }

        /// Property: Any inverse maps [0, 1] into [0, 1] with finite values
        /// and pins 0 to 0 and 1 to 1.
        #[test]
        fn prop_inverse_is_bounded(
            params in params_strategy(),
            y in 0.0f64..=1.0,
        ) {
            let inverse = solve(&StretchParameters { invert: true, ..params.clone() });
            let x = inverse.evaluate(y);
            prop_assert!(x.is_finite(), "{}: {} -> {}", params.canonical_key(), y, x);
            prop_assert!((-1e-9..=1.0 + 1e-9).contains(&x));
            prop_assert_eq!(inverse.evaluate(0.0), 0.0);
            prop_assert!((inverse.evaluate(1.0) - 1.0).abs() < 1e-9);
        }

        /// Property: A zero amount is the identity for every family.
        #[test]
        fn prop_zero_amount_is_identity(
            mut params in params_strategy(),
            x in -1.0f64..=2.0,
        ) {
            params.amount = 0.0;
            let set = solve(&params);
            prop_assert_eq!(set.family, StretchFamily::Identity);
            prop_assert_eq!(set.evaluate(x), x);
        }

        /// Property: The compiled expression binds every coefficient it names.
        #[test]
        fn prop_expression_symbols_are_bound(params in params_strategy()) {
            let compiled = compile(&solve(&params));
            for (name, value) in &compiled.bindings {
                prop_assert!(compiled.expression.contains(name.as_str()));
                prop_assert!(value.is_finite(), "{} = {}", name, value);
            }
        }
    }
}
