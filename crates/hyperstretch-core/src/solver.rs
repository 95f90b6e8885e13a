//! Family coefficient solver.
//!
//! Maps a [`StretchParameters`] onto a [`CoefficientSet`]: three breakpoints
//! and four segments whose values and slopes join up at the breakpoints.
//!
//! ## Kernel families
//!
//! The generalised hyperbolic sub-families, the histogram transformation and
//! the arcsinh stretch share one construction. Each supplies a shape
//! `F(u) = s * K(λu)` for distances `u >= 0` from the focus point `SP`:
//!
//! | family                  | K        | s         | λ    | e          |
//! |-------------------------|----------|-----------|------|------------|
//! | GHS b = -1 logarithmic  | ln(1+t)  | 1         | D    |            |
//! | GHS b < 0 integral      | power    | 1/(β-1)   | Dβ   | (β-1)/β    |
//! | GHS b = 0 exponential   | exp(t)-1 | -1        | -D   |            |
//! | GHS b > 0 hyperbolic    | power    | -1        | Db   | -1/b       |
//! | histogram transform     | t/(1+t)  | 1         | D    |            |
//! | arcsinh                 | asinh(t) | 1         | D    |            |
//!
//! where `β = -b`. Above the focus point the raw transform is `F(x - SP)`,
//! below it `-F(SP - x)`. Outside `[LP, HP]` it continues along the tangent
//! at the protection point. The raw values at 0 and 1 (`q0`, `q1`) fix the
//! normalisation `q = 1/(q1 - q0)`, so the result maps 0 to 0 and 1 to 1.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::params::{NormalizedParameters, StretchFamily, StretchParameters};
use crate::segment::{Segment, ShapeKind};
use crate::statistics::StfParameters;

// ============================================================================
// Coefficient Set
// ============================================================================

/// Whether a coefficient set evaluates the forward transform or its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

/// The three active breakpoints, `lpt <= spt <= hpt`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Breakpoints {
    pub lpt: f64,
    pub spt: f64,
    pub hpt: f64,
}

impl Breakpoints {
    pub const fn new(lpt: f64, spt: f64, hpt: f64) -> Self {
        Self { lpt, spt, hpt }
    }
}

/// Solved transform: breakpoints plus four segments.
///
/// Segment 1 covers `x < lpt`, segment 2 `lpt <= x < spt`, segment 3
/// `spt <= x < hpt` and segment 4 `x >= hpt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    /// Family actually built (`Identity` when the amount is zero).
    pub family: StretchFamily,
    pub direction: Direction,
    pub breakpoints: Breakpoints,
    pub segments: [Segment; 4],
    /// Whether the forward/inverse pair for these parameters is exact.
    ///
    /// `false` means the inverse is a preview approximation, valid only
    /// where the forward transform does not clip.
    pub is_true_inverse: bool,
    /// Forward-domain breakpoints of an inverse set.
    ///
    /// Each segment's output is held inside the forward interval it
    /// inverts, which keeps rounding near a flat forward segment from
    /// escaping into a neighbouring interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<Breakpoints>,
}

/// Smallest forward end slope whose inverse is trusted.
///
/// The forward slope is smallest at the protection points, so below this a
/// unit of rounding in the forward value costs more than a millionth of
/// the input range on the way back.
pub const MIN_INVERTIBLE_SLOPE: f64 = 1e-6;

impl CoefficientSet {
    /// The identity transform.
    pub fn identity(direction: Direction) -> Self {
        Self {
            family: StretchFamily::Identity,
            direction,
            breakpoints: Breakpoints::default(),
            segments: [Segment::identity(); 4],
            is_true_inverse: true,
            anchors: None,
        }
    }

    /// Same affine segment everywhere.
    fn affine(family: StretchFamily, direction: Direction, segment: Segment, exact: bool) -> Self {
        Self {
            family,
            direction,
            breakpoints: Breakpoints::default(),
            segments: [segment; 4],
            is_true_inverse: exact,
            anchors: None,
        }
    }

    pub fn is_inverse(&self) -> bool {
        self.direction == Direction::Inverse
    }

    /// Segment index (0-based) that `x` falls into.
    #[inline]
    pub fn segment_index(&self, x: f64) -> usize {
        let bp = &self.breakpoints;
        if x < bp.lpt {
            0
        } else if x < bp.spt {
            1
        } else if x < bp.hpt {
            2
        } else {
            3
        }
    }

    /// Invert segment by segment.
    ///
    /// `anchors` are the forward-domain breakpoints; the new breakpoints are
    /// their images under `self`, kept inside `(0, 1]` so that 0 and 1 land
    /// on the end segments. A segment without an inverse falls back to a
    /// constant: the domain edge for the end segments, the lower edge of its
    /// interval otherwise. A flat highlight segment also falls back to 1.
    /// Either fallback clears `is_true_inverse`.
    fn invert_segments(&self, anchors: Breakpoints) -> CoefficientSet {
        let fallback = [0.0, anchors.lpt, anchors.spt, 1.0];
        let mut exact = self.is_true_inverse;
        let mut segments = [Segment::identity(); 4];
        for (i, segment) in self.segments.iter().enumerate() {
            let flat_highlights = i == 3 && segment.b.abs() < MIN_INVERTIBLE_SLOPE;
            segments[i] = match segment.inverse() {
                Some(inverse) if !flat_highlights => inverse,
                _ => {
                    exact = false;
                    Segment::constant(fallback[i])
                }
            };
        }

        let lpt = self.evaluate(anchors.lpt).max(f64::MIN_POSITIVE);
        let spt = self.evaluate(anchors.spt).max(lpt);
        let hpt = self.evaluate(anchors.hpt).min(1.0).max(spt);
        trace!(
            "{} inverse breakpoints {} {} {} exact={}",
            self.family,
            lpt,
            spt,
            hpt,
            exact
        );

        CoefficientSet {
            family: self.family,
            direction: Direction::Inverse,
            breakpoints: Breakpoints::new(lpt, spt, hpt),
            segments,
            is_true_inverse: exact,
            anchors: Some(anchors),
        }
    }
}

// ============================================================================
// Generalised hyperbolic sub-families
// ============================================================================

/// Sub-family selected by the intensity `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HyperbolicKind {
    /// `b == -1`
    Logarithmic,
    /// `b < 0`, `b != -1`
    Integral,
    /// `b == 0`
    Exponential,
    /// `b > 0` (harmonic at `b == 1`)
    Hyperbolic,
}

impl HyperbolicKind {
    pub fn from_intensity(b: f64) -> Self {
        if b == -1.0 {
            HyperbolicKind::Logarithmic
        } else if b < 0.0 {
            HyperbolicKind::Integral
        } else if b == 0.0 {
            HyperbolicKind::Exponential
        } else {
            HyperbolicKind::Hyperbolic
        }
    }
}

/// Shape `F(u) = scale * K(rate * u, exponent)`.
#[derive(Debug, Clone, Copy)]
struct Kernel {
    shape: ShapeKind,
    scale: f64,
    rate: f64,
    exponent: f64,
}

impl Kernel {
    fn hyperbolic(b: f64, d: f64) -> Self {
        match HyperbolicKind::from_intensity(b) {
            HyperbolicKind::Logarithmic => Self::simple(ShapeKind::Log, d),
            HyperbolicKind::Integral => {
                let beta = -b;
                Kernel {
                    shape: ShapeKind::Power,
                    scale: 1.0 / (beta - 1.0),
                    rate: d * beta,
                    exponent: (beta - 1.0) / beta,
                }
            }
            HyperbolicKind::Exponential => Kernel {
                shape: ShapeKind::Exp,
                scale: -1.0,
                rate: -d,
                exponent: 0.0,
            },
            HyperbolicKind::Hyperbolic => Kernel {
                shape: ShapeKind::Power,
                scale: -1.0,
                rate: d * b,
                exponent: -1.0 / b,
            },
        }
    }

    fn simple(shape: ShapeKind, d: f64) -> Self {
        Kernel {
            shape,
            scale: 1.0,
            rate: d,
            exponent: 0.0,
        }
    }

    fn value(&self, u: f64) -> f64 {
        self.scale * self.shape.kernel(self.rate * u, self.exponent)
    }

    fn slope(&self, u: f64) -> f64 {
        self.scale * self.rate * self.shape.kernel_slope(self.rate * u, self.exponent)
    }

    /// Build the forward coefficient set around `SP` with protection points.
    fn solve(&self, family: StretchFamily, lp: f64, sp: f64, hp: f64) -> CoefficientSet {
        let slope_lp = self.slope(sp - lp);
        let slope_hp = self.slope(hp - sp);
        let qlp = -self.value(sp - lp);
        let qwp = self.value(hp - sp);
        let q0 = qlp - slope_lp * lp;
        let q1 = qwp + slope_hp * (1.0 - hp);
        let q = 1.0 / (q1 - q0);
        trace!(
            "{} kernel {:?}: q0={} q1={} q={}",
            family,
            self.shape,
            q0,
            q1,
            q
        );

        let centre = -q * q0;
        let below = Segment::curved(
            self.shape,
            centre,
            -q * self.scale,
            sp,
            -self.rate,
            self.exponent,
        );
        let above = Segment::curved(
            self.shape,
            centre,
            q * self.scale,
            sp,
            self.rate,
            self.exponent,
        );

        let segments = [
            Segment::linear(0.0, q * slope_lp),
            below,
            above,
            Segment::linear(q * (qwp - slope_hp * hp - q0), q * slope_hp),
        ];
        let exact = segments.iter().all(|s| s.inverse().is_some())
            && segments[0].b >= MIN_INVERTIBLE_SLOPE
            && segments[3].b >= MIN_INVERTIBLE_SLOPE;

        CoefficientSet {
            family,
            direction: Direction::Forward,
            breakpoints: Breakpoints::new(lp, sp, hp),
            segments,
            is_true_inverse: exact,
            anchors: None,
        }
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Solve the coefficient set for a parameter set.
///
/// Never fails: parameters are normalized first, and degenerate inputs map
/// onto explicit degenerate sets.
pub fn solve(params: &StretchParameters) -> CoefficientSet {
    solve_normalized(&params.normalized())
}

/// Solve from parameters that are already normalized.
pub fn solve_normalized(params: &NormalizedParameters) -> CoefficientSet {
    let direction = if params.invert {
        Direction::Inverse
    } else {
        Direction::Forward
    };

    if params.stretch == 0.0 {
        return CoefficientSet::identity(direction);
    }

    let (lp, sp, hp) = (
        params.shadow_protect,
        params.focus,
        params.highlight_protect,
    );
    let d = params.stretch;

    let kernel = match params.family {
        StretchFamily::GeneralizedHyperbolic => Kernel::hyperbolic(params.intensity, d),
        StretchFamily::HistogramTransformation => Kernel::simple(ShapeKind::Rational, d),
        StretchFamily::Arcsinh => Kernel::simple(ShapeKind::Asinh, d),
        StretchFamily::LinearStretch => {
            return linear_stretch(params.black_point, params.white_point, direction)
        }
        StretchFamily::Inversion => {
            return CoefficientSet::affine(
                StretchFamily::Inversion,
                direction,
                Segment::linear(1.0, -1.0),
                true,
            )
        }
        StretchFamily::Blend => {
            return CoefficientSet::affine(
                StretchFamily::Blend,
                direction,
                Segment::identity(),
                true,
            )
        }
        StretchFamily::ScreenTransferFunction => {
            return match params.stf {
                Some(stf) => screen_transfer(&stf, direction),
                None => CoefficientSet::identity(direction),
            }
        }
        StretchFamily::Identity => return CoefficientSet::identity(direction),
    };

    let forward = kernel.solve(params.family, lp, sp, hp);
    match direction {
        Direction::Forward => forward,
        Direction::Inverse => forward.invert_segments(Breakpoints::new(lp, sp, hp)),
    }
}

/// `(x - BP) / (WP - BP)` and its preview inverse.
fn linear_stretch(bp: f64, wp: f64, direction: Direction) -> CoefficientSet {
    let family = StretchFamily::LinearStretch;
    let width = wp - bp;
    if width <= 0.0 {
        let segment = match direction {
            Direction::Forward => Segment::constant(0.0),
            Direction::Inverse => Segment::constant(bp),
        };
        return CoefficientSet::affine(family, direction, segment, false);
    }

    // The bulk evaluator clips the forward result to [0, 1], so anything
    // below BP or above WP is lost.
    let exact = bp <= 0.0 && wp >= 1.0;
    let segment = match direction {
        Direction::Forward => Segment::linear(-bp / width, 1.0 / width),
        Direction::Inverse => Segment::linear(bp, width),
    };
    CoefficientSet::affine(family, direction, segment, exact)
}

/// Clip to `[c0, c1]` and apply the midtones transfer function.
fn screen_transfer(stf: &StfParameters, direction: Direction) -> CoefficientSet {
    let family = StretchFamily::ScreenTransferFunction;
    let stf = stf.clamped();
    let (c0, m, c1) = (stf.shadow_clip, stf.midtone, stf.highlight_clip);
    let exact = c0 == 0.0 && c1 == 1.0;
    let width = c1 - c0;

    if width <= 0.0 {
        // Step at c0.
        let forward = CoefficientSet {
            family,
            direction: Direction::Forward,
            breakpoints: Breakpoints::new(c0, c0, c0),
            segments: [
                Segment::constant(0.0),
                Segment::constant(0.0),
                Segment::constant(0.0),
                Segment::constant(1.0),
            ],
            is_true_inverse: false,
            anchors: None,
        };
        return match direction {
            Direction::Forward => forward,
            Direction::Inverse => forward.invert_segments(Breakpoints::new(c0, c0, c0)),
        };
    }

    let middle = if m == 0.5 {
        Segment::linear(-c0 / width, 1.0 / width)
    } else {
        // mtf(m, u) = αu / (1 + γu) = (α/γ) K(γu)
        let alpha = (1.0 - m) / m;
        let gamma = (1.0 - 2.0 * m) / m;
        Segment::curved(ShapeKind::Rational, 0.0, alpha / gamma, c0, gamma / width, 0.0)
    };

    let forward = CoefficientSet {
        family,
        direction: Direction::Forward,
        breakpoints: Breakpoints::new(c0, c0, c1),
        segments: [
            Segment::constant(0.0),
            middle,
            middle,
            Segment::constant(1.0),
        ],
        is_true_inverse: exact,
        anchors: None,
    };

    match direction {
        Direction::Forward => forward,
        Direction::Inverse => {
            let mut inverse = forward.invert_segments(Breakpoints::new(c0, c0, c1));
            inverse.is_true_inverse = exact;
            inverse
        }
    }
}
