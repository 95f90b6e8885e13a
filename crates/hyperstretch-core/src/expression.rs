//! Expression compiler for external bulk evaluation.
//!
//! Turns a [`CoefficientSet`] into a nested conditional expression such as
//!
//! ```text
//! iif($T<LPT, a1+b1*$T, iif($T<SPT, seg2, iif($T<HPT, seg3, a4+b4*$T)))
//! ```
//!
//! plus the symbol bindings it references. Coefficients are never inlined:
//! every value is bound to a short symbol (`a2`, `b2`, `c2`, ...) so the
//! expression stays compact and readable when the user inspects it.
//!
//! Segments whose interval is empty on `[0, +inf)` are left out entirely, so
//! the evaluator never parses dead branches. Only `+ - * / ^ ln exp sqrt iif`
//! are emitted.
//!
//! Inverse sets hold each segment's output inside its forward interval when
//! evaluated here; the expression carries the bare segments.

use serde::{Deserialize, Serialize};

use crate::segment::{Segment, ShapeKind};
use crate::solver::CoefficientSet;

/// Default symbol for the target pixel value.
pub const PIXEL_SYMBOL: &str = "$T";

/// Expression text and the symbol values it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledExpression {
    pub expression: String,
    /// `(name, value)` pairs in first-use order.
    pub bindings: Vec<(String, f64)>,
}

impl CompiledExpression {
    /// Symbol declarations as `name=value` pairs, comma separated.
    pub fn symbols(&self) -> String {
        self.bindings
            .iter()
            .map(|(name, value)| format!("{}={}", name, format_decimal(*value)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look up a bound value by name.
    pub fn binding(&self, name: &str) -> Option<f64> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Number of conditionals in the expression.
    pub fn conditional_count(&self) -> usize {
        self.expression.matches("iif(").count()
    }
}

/// Compile against the default pixel symbol.
pub fn compile(coefficients: &CoefficientSet) -> CompiledExpression {
    compile_with_symbol(coefficients, PIXEL_SYMBOL)
}

/// Compile with `pixel` standing for the input value.
pub fn compile_with_symbol(coefficients: &CoefficientSet, pixel: &str) -> CompiledExpression {
    let bp = coefficients.breakpoints;
    let segs = &coefficients.segments;

    // Inverse sets lift a zero LPT to the smallest normal value so that 0
    // stays on segment 1; that is still the domain edge.
    let has_seg1 = bp.lpt > f64::MIN_POSITIVE;
    let has_seg2 = bp.spt > bp.lpt.max(0.0);
    let has_seg3 = bp.hpt > bp.spt.max(0.0);

    let mut bindings = Vec::new();
    let mut bind = |name: String, value: f64| {
        bindings.push((name, value));
    };

    // Bindings in reading order: breakpoints first, then segments.
    if has_seg1 {
        bind("LPT".to_string(), bp.lpt);
    }
    if has_seg2 {
        bind("SPT".to_string(), bp.spt);
    }
    if has_seg3 {
        bind("HPT".to_string(), bp.hpt);
    }
    let included = [has_seg1, has_seg2, has_seg3, true];
    for (i, segment) in segs.iter().enumerate() {
        if included[i] {
            for (name, value) in segment_bindings(segment, i + 1) {
                bind(name, value);
            }
        }
    }

    let mut expression = segment_text(&segs[3], 4, pixel);
    if has_seg3 {
        expression = format!(
            "iif({p}<HPT, {}, {})",
            segment_text(&segs[2], 3, pixel),
            expression,
            p = pixel
        );
    }
    if has_seg2 {
        expression = format!(
            "iif({p}<SPT, {}, {})",
            segment_text(&segs[1], 2, pixel),
            expression,
            p = pixel
        );
    }
    if has_seg1 {
        expression = format!(
            "iif({p}<LPT, {}, {})",
            segment_text(&segs[0], 1, pixel),
            expression,
            p = pixel
        );
    }

    CompiledExpression {
        expression,
        bindings,
    }
}

fn segment_bindings(segment: &Segment, index: usize) -> Vec<(String, f64)> {
    let mut out = vec![
        (format!("a{}", index), segment.a),
        (format!("b{}", index), segment.b),
    ];
    if !segment.is_linear() {
        out.push((format!("c{}", index), segment.c));
        out.push((format!("d{}", index), segment.d));
        if segment.shape == ShapeKind::Power {
            out.push((format!("e{}", index), segment.e));
        }
    }
    out
}

fn segment_text(segment: &Segment, index: usize, pixel: &str) -> String {
    let i = index;
    // t = d*(x - c)
    let t = format!("d{i}*({pixel}-c{i})");
    match segment.shape {
        ShapeKind::Linear => format!("a{i}+b{i}*{pixel}"),
        ShapeKind::Log => format!("a{i}+b{i}*ln(1+{t})"),
        ShapeKind::Exp => format!("a{i}+b{i}*(exp({t})-1)"),
        ShapeKind::Power => format!("a{i}+b{i}*((1+{t})^e{i}-1)"),
        ShapeKind::Rational => format!("a{i}+b{i}*({t})/(1+{t})"),
        ShapeKind::Asinh => format!("a{i}+b{i}*ln({t}+sqrt(({t})^2+1))"),
        ShapeKind::Sinh => format!("a{i}+b{i}*(exp({t})-exp(-({t})))/2"),
    }
}

/// Plain decimal rendering (never scientific notation).
fn format_decimal(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{StretchFamily, StretchParameters};
    use crate::solver::{solve, Breakpoints, Direction};

    fn ghs(b: f64, lp: f64, sp: f64, hp: f64) -> CoefficientSet {
        solve(&StretchParameters {
            family: StretchFamily::GeneralizedHyperbolic,
            intensity: b,
            amount: 2.0,
            shadow_protect: lp,
            focus: sp,
            highlight_protect: hp,
            ..StretchParameters::default()
        })
    }

    #[test]
    fn test_leading_segment_elided_when_lpt_is_zero() {
        let compiled = compile(&ghs(1.0, 0.0, 0.4, 1.0));
        assert_eq!(compiled.conditional_count(), 2);
        assert!(!compiled.expression.contains("LPT"));
        assert!(!compiled.expression.contains("a1"));
        assert!(compiled.expression.starts_with("iif($T<SPT, "));
        assert!(compiled.binding("LPT").is_none());
        assert_eq!(compiled.binding("SPT"), Some(0.4));
    }

    #[test]
    fn test_all_segments_present() {
        let compiled = compile(&ghs(1.0, 0.1, 0.4, 0.9));
        assert_eq!(compiled.conditional_count(), 3);
        assert!(compiled.expression.starts_with("iif($T<LPT, a1+b1*$T, iif($T<SPT, "));
        assert!(compiled.expression.ends_with("a4+b4*$T)))"));
        for name in ["LPT", "SPT", "HPT", "a1", "b1", "a2", "e2", "e3", "b4"] {
            assert!(compiled.binding(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_empty_focus_segment_elided() {
        let compiled = compile(&ghs(0.0, 0.0, 0.0, 1.0));
        assert_eq!(compiled.conditional_count(), 1);
        assert!(compiled.expression.starts_with("iif($T<HPT, "));
        // Exponential kernels carry no exponent symbol.
        assert!(compiled.binding("e3").is_none());
    }

    #[test]
    fn test_identity_compiles_to_single_segment() {
        let compiled = compile(&CoefficientSet::identity(Direction::Forward));
        assert_eq!(compiled.expression, "a4+b4*$T");
        assert_eq!(compiled.binding("a4"), Some(0.0));
        assert_eq!(compiled.binding("b4"), Some(1.0));
    }

    #[test]
    fn test_bindings_match_coefficients() {
        let set = ghs(-1.0, 0.1, 0.4, 0.9);
        let compiled = compile(&set);
        assert_eq!(compiled.binding("a2"), Some(set.segments[1].a));
        assert_eq!(compiled.binding("d3"), Some(set.segments[2].d));
        assert_eq!(compiled.binding("b4"), Some(set.segments[3].b));
        assert!(compiled.expression.contains("ln(1+d2*($T-c2))"));
    }

    #[test]
    fn test_only_supported_operators() {
        let families = [
            (StretchFamily::GeneralizedHyperbolic, -2.0),
            (StretchFamily::GeneralizedHyperbolic, 0.0),
            (StretchFamily::HistogramTransformation, 0.0),
            (StretchFamily::Arcsinh, 0.0),
        ];
        for (family, b) in families {
            for invert in [false, true] {
                let set = solve(&StretchParameters {
                    family,
                    intensity: b,
                    amount: 1.0,
                    shadow_protect: 0.1,
                    focus: 0.3,
                    highlight_protect: 0.9,
                    invert,
                    ..StretchParameters::default()
                });
                let compiled = compile(&set);
                let stripped = compiled
                    .expression
                    .replace("iif", "")
                    .replace("ln", "")
                    .replace("exp", "")
                    .replace("sqrt", "")
                    .replace("$T", "");
                for ch in stripped.chars() {
                    assert!(
                        ch.is_ascii_alphanumeric() || "+-*/^(), <".contains(ch),
                        "unexpected {:?} in {}",
                        ch,
                        compiled.expression
                    );
                }
            }
        }
    }

    #[test]
    fn test_symbols_are_plain_decimals() {
        let mut set = CoefficientSet::identity(Direction::Forward);
        set.segments[3] = Segment::linear(0.0000001, 2.5);
        let compiled = compile(&set);
        assert_eq!(compiled.symbols(), "a4=0.0000001, b4=2.5");
    }

    #[test]
    fn test_segment_text_per_shape() {
        let curved = |shape| Segment::curved(shape, 0.0, 1.0, 0.5, 2.0, 0.5);
        assert_eq!(segment_text(&Segment::identity(), 4, "x"), "a4+b4*x");
        assert_eq!(
            segment_text(&curved(ShapeKind::Log), 2, "x"),
            "a2+b2*ln(1+d2*(x-c2))"
        );
        assert_eq!(
            segment_text(&curved(ShapeKind::Power), 3, "x"),
            "a3+b3*((1+d3*(x-c3))^e3-1)"
        );
        assert_eq!(
            segment_text(&curved(ShapeKind::Rational), 2, "$T"),
            "a2+b2*(d2*($T-c2))/(1+d2*($T-c2))"
        );
    }

    #[test]
    fn test_inverse_with_zero_shadow_protection_elides_segment_one() {
        let inverse = solve(&StretchParameters {
            family: StretchFamily::GeneralizedHyperbolic,
            intensity: 1.0,
            amount: 2.0,
            shadow_protect: 0.0,
            focus: 0.4,
            highlight_protect: 1.0,
            invert: true,
            ..StretchParameters::default()
        });
        let compiled = compile(&inverse);
        assert!(compiled.binding("LPT").is_none());
        assert!(compiled.expression.starts_with("iif($T<SPT, "));
    }

    #[test]
    fn test_custom_pixel_symbol() {
        let mut set = CoefficientSet::identity(Direction::Forward);
        set.breakpoints = Breakpoints::new(0.5, 0.5, 0.5);
        let compiled = compile_with_symbol(&set, "x");
        assert_eq!(compiled.expression, "iif(x<LPT, a1+b1*x, a4+b4*x)");
    }

    /// Tiny interpreter for the emitted grammar, to check the text agrees
    /// with the evaluator.
    fn interpret(compiled: &CompiledExpression, x: f64) -> f64 {
        struct Parser<'a> {
            src: &'a [u8],
            pos: usize,
            x: f64,
            vars: &'a [(String, f64)],
        }
        impl Parser<'_> {
            fn peek(&self) -> Option<u8> {
                self.src.get(self.pos).copied()
            }
            fn skip_ws(&mut self) {
                while self.peek() == Some(b' ') {
                    self.pos += 1;
                }
            }
            fn eat(&mut self, c: u8) -> bool {
                self.skip_ws();
                if self.peek() == Some(c) {
                    self.pos += 1;
                    true
                } else {
                    false
                }
            }
            fn comparison(&mut self) -> f64 {
                let lhs = self.sum();
                if self.eat(b'<') {
                    let rhs = self.sum();
                    if lhs < rhs {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    lhs
                }
            }
            fn sum(&mut self) -> f64 {
                let mut v = self.product();
                loop {
                    if self.eat(b'+') {
                        v += self.product();
                    } else if self.eat(b'-') {
                        v -= self.product();
                    } else {
                        return v;
                    }
                }
            }
            fn product(&mut self) -> f64 {
                let mut v = self.power();
                loop {
                    if self.eat(b'*') {
                        v *= self.power();
                    } else if self.eat(b'/') {
                        v /= self.power();
                    } else {
                        return v;
                    }
                }
            }
            fn power(&mut self) -> f64 {
                let base = self.unary();
                if self.eat(b'^') {
                    base.powf(self.unary())
                } else {
                    base
                }
            }
            fn unary(&mut self) -> f64 {
                if self.eat(b'-') {
                    -self.unary()
                } else {
                    self.atom()
                }
            }
            fn atom(&mut self) -> f64 {
                self.skip_ws();
                if self.eat(b'(') {
                    let v = self.comparison();
                    assert!(self.eat(b')'));
                    return v;
                }
                if self.peek() == Some(b'$') {
                    self.pos += 2;
                    return self.x;
                }
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'.')
                {
                    self.pos += 1;
                }
                let word = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                if let Ok(n) = word.parse::<f64>() {
                    return n;
                }
                if self.eat(b'(') {
                    let first = self.comparison();
                    let v = match word {
                        "ln" => first.ln(),
                        "exp" => first.exp(),
                        "sqrt" => first.sqrt(),
                        "iif" => {
                            assert!(self.eat(b','));
                            let a = self.comparison();
                            assert!(self.eat(b','));
                            let b = self.comparison();
                            if first != 0.0 {
                                a
                            } else {
                                b
                            }
                        }
                        other => panic!("unknown function {}", other),
                    };
                    assert!(self.eat(b')'));
                    return v;
                }
                self.vars
                    .iter()
                    .find(|(n, _)| n == word)
                    .map(|(_, v)| *v)
                    .unwrap_or_else(|| panic!("unbound symbol {}", word))
            }
        }
        let mut parser = Parser {
            src: compiled.expression.as_bytes(),
            pos: 0,
            x,
            vars: &compiled.bindings,
        };
        parser.comparison()
    }

    #[test]
    fn test_expression_agrees_with_evaluator() {
        let cases = [
            (StretchFamily::GeneralizedHyperbolic, -1.0),
            (StretchFamily::GeneralizedHyperbolic, -2.5),
            (StretchFamily::GeneralizedHyperbolic, 0.0),
            (StretchFamily::GeneralizedHyperbolic, 3.0),
            (StretchFamily::HistogramTransformation, 0.0),
            (StretchFamily::Arcsinh, 0.0),
        ];
        for (family, b) in cases {
            for invert in [false, true] {
                let set = solve(&StretchParameters {
                    family,
                    intensity: b,
                    amount: 1.5,
                    shadow_protect: 0.05,
                    focus: 0.2,
                    highlight_protect: 0.85,
                    invert,
                    ..StretchParameters::default()
                });
                let compiled = compile(&set);
                for i in 0..=50 {
                    let x = i as f64 / 50.0;
                    let expected = set.evaluate(x);
                    let got = interpret(&compiled, x);
                    assert!(
                        (expected - got).abs() < 1e-9,
                        "{:?} b={} invert={} x={}: {} vs {}",
                        family,
                        b,
                        invert,
                        x,
                        expected,
                        got
                    );
                }
            }
        }
    }
}
