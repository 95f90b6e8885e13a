//! Piecewise evaluation of a solved transform.
//!
//! Branch selection compares `x` against `lpt`, then `spt`, then `hpt`, so
//! the four segments cover `(-inf, lpt)`, `[lpt, spt)`, `[spt, hpt)` and
//! `[hpt, +inf)`. Forward sets are never clamped: inputs outside `[0, 1]`
//! follow the affine end segments, which is what lets a linear stretch with
//! a negative black point extend the dynamic range. Segment-wise inverse
//! sets hold each segment's output inside the forward interval it inverts.
//!
//! Every function here is pure. Ranges are independent of each other, so
//! callers can split a large buffer and evaluate the pieces in parallel.

use std::iter::FusedIterator;

use crate::solver::{Breakpoints, CoefficientSet};

impl CoefficientSet {
    /// Evaluate the transform at `x`.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        let index = self.segment_index(x);
        let y = self.segments[index].evaluate(x);
        match self.anchors {
            Some(anchors) => hold_in_interval(y, anchors, index),
            None => y,
        }
    }

    /// Lazily evaluate `count` points `start, start + step, ...`.
    pub fn range(&self, start: f64, step: f64, count: usize) -> StretchRange<'_> {
        StretchRange {
            coefficients: self,
            start,
            step,
            front: 0,
            back: count,
        }
    }

    /// Evaluate `count` points `start, start + step, ...` into a vector.
    pub fn evaluate_range(&self, start: f64, step: f64, count: usize) -> Vec<f64> {
        self.range(start, step, count).collect()
    }

    /// Replace every value in `values` with its transformed value.
    pub fn evaluate_in_place(&self, values: &mut [f64]) {
        for value in values.iter_mut() {
            *value = self.evaluate(*value);
        }
    }
}

/// NaN passes through.
#[inline]
fn hold_in_interval(y: f64, anchors: Breakpoints, index: usize) -> f64 {
    let (lo, hi) = match index {
        0 => (f64::NEG_INFINITY, anchors.lpt),
        1 => (anchors.lpt, anchors.spt),
        2 => (anchors.spt, anchors.hpt),
        _ => (anchors.hpt, f64::INFINITY),
    };
    if y < lo {
        lo
    } else if y > hi {
        hi
    } else {
        y
    }
}

/// Evaluate `coefficients` at `x`.
#[inline]
pub fn evaluate(coefficients: &CoefficientSet, x: f64) -> f64 {
    coefficients.evaluate(x)
}

/// Evaluate `coefficients` over a strided range.
pub fn evaluate_range(
    coefficients: &CoefficientSet,
    start: f64,
    step: f64,
    count: usize,
) -> Vec<f64> {
    coefficients.evaluate_range(start, step, count)
}

/// Iterator over a strided range of transformed values.
///
/// Sample `i` is taken at `start + i * step` rather than by accumulating
/// `step`, so long ranges do not drift.
#[derive(Debug, Clone)]
pub struct StretchRange<'a> {
    coefficients: &'a CoefficientSet,
    start: f64,
    step: f64,
    front: usize,
    back: usize,
}

impl StretchRange<'_> {
    #[inline]
    fn sample(&self, i: usize) -> f64 {
        self.coefficients.evaluate(self.start + i as f64 * self.step)
    }
}

impl Iterator for StretchRange<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.front >= self.back {
            return None;
        }
        let value = self.sample(self.front);
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for StretchRange<'_> {
    fn next_back(&mut self) -> Option<f64> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.sample(self.back))
    }
}

impl ExactSizeIterator for StretchRange<'_> {}

impl FusedIterator for StretchRange<'_> {}
