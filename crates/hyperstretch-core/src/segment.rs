//! Segment shapes shared by the solver, the evaluator and the expression compiler.
//!
//! Every nonlinear segment evaluates `a + b * K(d * (x - c), e)` where the
//! kernel `K` satisfies `K(0) = 0`, so `a` is exactly the segment value at its
//! centre `c`. Affine segments evaluate `a + b * x`.
//!
//! Each kernel has a closed-form inverse that is itself a kernel, which is
//! what lets the solver build exact inverse transforms by inverting segments
//! one at a time.

use serde::{Deserialize, Serialize};

/// Kernel used by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    /// `a + b*x`
    #[default]
    Linear,
    /// `K(t) = ln(1 + t)`
    Log,
    /// `K(t) = exp(t) - 1`
    Exp,
    /// `K(t) = (1 + t)^e - 1`, evaluated as `exp_m1(e * ln_1p(t))`
    Power,
    /// `K(t) = t / (1 + t)`
    Rational,
    /// `K(t) = asinh(t)`
    Asinh,
    /// `K(t) = sinh(t)`
    Sinh,
}

impl ShapeKind {
    /// Evaluate the kernel at `t`.
    ///
    /// Kernels with a pole or branch point at `t = -1` hold smaller
    /// arguments on it, so they return an infinity instead of NaN. NaN
    /// arguments still propagate.
    #[inline]
    pub fn kernel(self, t: f64, e: f64) -> f64 {
        match self {
            ShapeKind::Linear => t,
            ShapeKind::Log => hold_at_pole(t).ln_1p(),
            ShapeKind::Exp => t.exp_m1(),
            ShapeKind::Power => (e * hold_at_pole(t).ln_1p()).exp_m1(),
            ShapeKind::Rational => {
                let t = hold_at_pole(t);
                t / (1.0 + t)
            }
            ShapeKind::Asinh => t.asinh(),
            ShapeKind::Sinh => t.sinh(),
        }
    }

    /// Derivative of the kernel at `t`.
    #[inline]
    pub fn kernel_slope(self, t: f64, e: f64) -> f64 {
        match self {
            ShapeKind::Linear => 1.0,
            ShapeKind::Log => 1.0 / (1.0 + t),
            ShapeKind::Exp => t.exp(),
            ShapeKind::Power => e * (1.0 + t).powf(e - 1.0),
            ShapeKind::Rational => 1.0 / ((1.0 + t) * (1.0 + t)),
            ShapeKind::Asinh => 1.0 / (1.0 + t * t).sqrt(),
            ShapeKind::Sinh => t.cosh(),
        }
    }
}

#[inline]
fn hold_at_pole(t: f64) -> f64 {
    if t < -1.0 {
        -1.0
    } else {
        t
    }
}

/// One piece of a piecewise transform.
///
/// Unused coefficients are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub shape: ShapeKind,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl Segment {
    /// Affine segment `a + b*x`.
    pub const fn linear(a: f64, b: f64) -> Self {
        Self {
            shape: ShapeKind::Linear,
            a,
            b,
            c: 0.0,
            d: 0.0,
            e: 0.0,
        }
    }

    /// The identity segment `x`.
    pub const fn identity() -> Self {
        Self::linear(0.0, 1.0)
    }

    /// Constant segment.
    pub const fn constant(value: f64) -> Self {
        Self::linear(value, 0.0)
    }

    /// Nonlinear segment `a + b*K(d*(x - c), e)`.
    pub const fn curved(shape: ShapeKind, a: f64, b: f64, c: f64, d: f64, e: f64) -> Self {
        Self { shape, a, b, c, d, e }
    }

    /// Evaluate the segment at `x`. No clamping is applied.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        match self.shape {
            ShapeKind::Linear => self.a + self.b * x,
            shape => self.a + self.b * shape.kernel(self.d * (x - self.c), self.e),
        }
    }

    /// First derivative of the segment at `x`.
    pub fn slope(&self, x: f64) -> f64 {
        match self.shape {
            ShapeKind::Linear => self.b,
            shape => self.b * self.d * shape.kernel_slope(self.d * (x - self.c), self.e),
        }
    }

    pub fn is_linear(&self) -> bool {
        self.shape == ShapeKind::Linear
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Closed-form inverse of the segment.
    ///
    /// Returns `None` for constant segments (`b == 0`), for curved segments
    /// with `d == 0`, and whenever an inverse coefficient overflows (a
    /// subnormal slope has no representable reciprocal).
    pub fn inverse(&self) -> Option<Segment> {
        self.inverse_coefficients().filter(Segment::is_finite)
    }

    fn inverse_coefficients(&self) -> Option<Segment> {
        if self.b == 0.0 {
            return None;
        }
        // y = a + b*K(d*(x - c))  =>  x = c + K⁻¹((y - a)/b) / d
        let (shape, sign, e) = match self.shape {
            ShapeKind::Linear => return Some(Segment::linear(-self.a / self.b, 1.0 / self.b)),
            ShapeKind::Log => (ShapeKind::Exp, 1.0, 0.0),
            ShapeKind::Exp => (ShapeKind::Log, 1.0, 0.0),
            ShapeKind::Power => (ShapeKind::Power, 1.0, 1.0 / self.e),
            // s = t/(1+t)  =>  t = s/(1-s) = -K(-s)
            ShapeKind::Rational => (ShapeKind::Rational, -1.0, 0.0),
            ShapeKind::Asinh => (ShapeKind::Sinh, 1.0, 0.0),
            ShapeKind::Sinh => (ShapeKind::Asinh, 1.0, 0.0),
        };
        if self.d == 0.0 {
            return None;
        }
        Some(Segment::curved(shape, self.c, sign / self.d, self.a, sign / self.b, e))
    }
}
