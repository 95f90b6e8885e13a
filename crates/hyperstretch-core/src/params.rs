//! Stretch parameters, bounds, normalization and the canonical key.
//!
//! [`StretchParameters`] is the raw, caller-owned record the UI edits.
//! [`StretchParameters::normalized`] turns it into a
//! [`NormalizedParameters`] with every field clamped to its bounds, the
//! protection breakpoints ordered around the focus point, and the stretch
//! amount passed through the `D = exp(k * D_raw) - 1` remap.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::statistics::StfParameters;

// ============================================================================
// Bounds
// ============================================================================

/// Bounds of the stretch amount `D_raw` (the slider value, `ln(D + 1)`).
pub const AMOUNT_RANGE: (f64, f64) = (0.0, 10.0);

/// Bounds of the stretch intensity `b`.
pub const INTENSITY_RANGE: (f64, f64) = (-5.0, 15.0);

/// Bounds of the protection breakpoints `LP`, `SP` and `HP`.
pub const BREAKPOINT_RANGE: (f64, f64) = (0.0, 1.0);

/// Bounds of the linear stretch black point.
pub const BLACK_POINT_RANGE: (f64, f64) = (-1.0, 1.0);

/// Bounds of the linear stretch white point.
pub const WHITE_POINT_RANGE: (f64, f64) = (0.0, 2.0);

/// Bounds of the blend ratio.
pub const BLEND_RATIO_RANGE: (f64, f64) = (0.0, 1.0);

/// Scale `k` of the amount remap `D = exp(k * D_raw) - 1`.
pub const AMOUNT_SCALE: f64 = 1.0;

/// Map the raw amount slider onto the stretch factor `D`.
///
/// Monotonic, with `amount_to_stretch(0.0) == 0.0`.
#[inline]
pub fn amount_to_stretch(amount: f64) -> f64 {
    (AMOUNT_SCALE * amount).exp_m1()
}

// ============================================================================
// Enumerations
// ============================================================================

/// The stretch families the solver knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StretchFamily {
    /// Generalised hyperbolic stretch; `intensity` picks the sub-family.
    #[default]
    GeneralizedHyperbolic,
    /// Midtones transfer function expressed around the focus point.
    HistogramTransformation,
    /// Inverse hyperbolic sine around the focus point.
    Arcsinh,
    /// Affine remap of `[BP, WP]` onto `[0, 1]`.
    LinearStretch,
    /// `1 - x`.
    Inversion,
    /// Identity placeholder; mixing with the partner happens downstream.
    Blend,
    /// Auto-stretch driven by image statistics.
    ScreenTransferFunction,
    /// `x`.
    Identity,
}

impl StretchFamily {
    /// Short code used in the canonical key and in logs.
    pub fn code(self) -> &'static str {
        match self {
            StretchFamily::GeneralizedHyperbolic => "GHS",
            StretchFamily::HistogramTransformation => "HT",
            StretchFamily::Arcsinh => "ASINH",
            StretchFamily::LinearStretch => "LINEAR",
            StretchFamily::Inversion => "INVERT",
            StretchFamily::Blend => "BLEND",
            StretchFamily::ScreenTransferFunction => "STF",
            StretchFamily::Identity => "IDENTITY",
        }
    }

    /// Whether coefficients depend on live image statistics rather than
    /// parameters alone.
    pub fn depends_on_statistics(self) -> bool {
        matches!(self, StretchFamily::ScreenTransferFunction)
    }
}

impl fmt::Display for StretchFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single colour channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in RGB order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Position of the channel in an interleaved RGB pixel.
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Which channels a stretch is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelSelection {
    #[default]
    All,
    Red,
    Green,
    Blue,
}

impl ChannelSelection {
    /// Per-channel mask handed to the bulk evaluator, in RGB order.
    pub fn mask(self) -> [bool; 3] {
        match self {
            ChannelSelection::All => [true, true, true],
            ChannelSelection::Red => [true, false, false],
            ChannelSelection::Green => [false, true, false],
            ChannelSelection::Blue => [false, false, true],
        }
    }

    /// The single channel selected, if any.
    pub fn single(self) -> Option<Channel> {
        match self {
            ChannelSelection::All => None,
            ChannelSelection::Red => Some(Channel::Red),
            ChannelSelection::Green => Some(Channel::Green),
            ChannelSelection::Blue => Some(Channel::Blue),
        }
    }

    fn code(self) -> &'static str {
        match self {
            ChannelSelection::All => "RGB",
            ChannelSelection::Red => "R",
            ChannelSelection::Green => "G",
            ChannelSelection::Blue => "B",
        }
    }
}

// ============================================================================
// Parameter Set
// ============================================================================

/// Raw user inputs for one stretch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StretchParameters {
    /// Stretch family
    pub family: StretchFamily,
    /// Stretch intensity `b` (-5 to 15)
    pub intensity: f64,
    /// Stretch amount `D_raw` (0 to 10), remapped to `D = exp(D_raw) - 1`
    pub amount: f64,
    /// Shadow protection point `LP` (0 to 1)
    pub shadow_protect: f64,
    /// Focus point `SP` (0 to 1)
    pub focus: f64,
    /// Highlight protection point `HP` (0 to 1)
    pub highlight_protect: f64,
    /// Linear stretch black point (-1 to 1)
    pub black_point: f64,
    /// Linear stretch white point (0 to 2)
    pub white_point: f64,
    /// Request the declared inverse of the forward transform
    pub invert: bool,
    /// Channels the stretch applies to
    pub channel: ChannelSelection,
    /// Use one set of statistics for all channels
    pub linked: bool,
    /// Image the blend family mixes with
    pub blend_partner: Option<String>,
    /// Weight of the blend partner (0 to 1)
    pub blend_ratio: f64,
    /// Statistics-derived parameters for the screen transfer function
    pub stf: Option<StfParameters>,
}

impl Default for StretchParameters {
    fn default() -> Self {
        Self {
            family: StretchFamily::GeneralizedHyperbolic,
            intensity: 0.0,
            amount: 0.0,
            shadow_protect: 0.0,
            focus: 0.0,
            highlight_protect: 1.0,
            black_point: 0.0,
            white_point: 1.0,
            invert: false,
            channel: ChannelSelection::All,
            linked: true,
            blend_partner: None,
            blend_ratio: 0.5,
            stf: None,
        }
    }
}

impl StretchParameters {
    /// Create parameters with default values (an identity stretch).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create parameters for a family with the remaining fields defaulted.
    pub fn for_family(family: StretchFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    /// Check if all values are at their defaults
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Clamp every field to its bounds and apply the amount remap.
    ///
    /// The focus point is authoritative: `LP` is pulled down to it and `HP`
    /// pulled up to it. The black point is pulled down to the white point,
    /// so `BP > WP` degenerates to `BP == WP`.
    pub fn normalized(&self) -> NormalizedParameters {
        let lp = clamp_finite(self.shadow_protect, BREAKPOINT_RANGE);
        let sp = clamp_finite(self.focus, BREAKPOINT_RANGE);
        let hp = clamp_finite(self.highlight_protect, BREAKPOINT_RANGE);
        let wp = clamp_finite(self.white_point, WHITE_POINT_RANGE);
        let bp = clamp_finite(self.black_point, BLACK_POINT_RANGE).min(wp);
        let amount = clamp_finite(self.amount, AMOUNT_RANGE);

        NormalizedParameters {
            family: self.family,
            intensity: clamp_finite(self.intensity, INTENSITY_RANGE),
            stretch: amount_to_stretch(amount),
            shadow_protect: lp.min(sp),
            focus: sp,
            highlight_protect: hp.max(sp),
            black_point: bp,
            white_point: wp,
            invert: self.invert,
            stf: self.stf.map(StfParameters::clamped),
        }
    }

    /// Strictly check bounds and orderings without clamping.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_range("intensity", self.intensity, INTENSITY_RANGE)?;
        check_range("amount", self.amount, AMOUNT_RANGE)?;
        check_range("shadow_protect", self.shadow_protect, BREAKPOINT_RANGE)?;
        check_range("focus", self.focus, BREAKPOINT_RANGE)?;
        check_range("highlight_protect", self.highlight_protect, BREAKPOINT_RANGE)?;
        check_range("black_point", self.black_point, BLACK_POINT_RANGE)?;
        check_range("white_point", self.white_point, WHITE_POINT_RANGE)?;
        check_range("blend_ratio", self.blend_ratio, BLEND_RATIO_RANGE)?;

        if !(self.shadow_protect <= self.focus && self.focus <= self.highlight_protect) {
            return Err(ParameterError::UnorderedBreakpoints {
                lp: self.shadow_protect,
                sp: self.focus,
                hp: self.highlight_protect,
            });
        }

        if self.family == StretchFamily::LinearStretch && self.black_point >= self.white_point {
            return Err(ParameterError::BlackAboveWhite {
                black: self.black_point,
                white: self.white_point,
            });
        }

        Ok(())
    }

    /// Fixed-precision serialization of every field.
    ///
    /// Intensity and amount use 2 decimals, breakpoints 5, black and white
    /// points 4. Used as the recalculation cache key and for audit logs.
    pub fn canonical_key(&self) -> String {
        let stf = match &self.stf {
            Some(stf) => format!(
                "{:.5},{:.5},{:.5}",
                stf.shadow_clip, stf.midtone, stf.highlight_clip
            ),
            None => "none".to_string(),
        };

        format!(
            "{}|b={:.2}|D={:.2}|LP={:.5}|SP={:.5}|HP={:.5}|BP={:.4}|WP={:.4}|inv={}|ch={}|linked={}|blend={}|ratio={:.2}|stf={}",
            self.family.code(),
            self.intensity,
            self.amount,
            self.shadow_protect,
            self.focus,
            self.highlight_protect,
            self.black_point,
            self.white_point,
            u8::from(self.invert),
            self.channel.code(),
            u8::from(self.linked),
            self.blend_partner.as_deref().unwrap_or("-"),
            self.blend_ratio,
            stf,
        )
    }
}

/// Parameters after clamping, ordering and the amount remap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParameters {
    pub family: StretchFamily,
    /// Intensity `b`
    pub intensity: f64,
    /// Stretch factor `D` after the remap
    pub stretch: f64,
    pub shadow_protect: f64,
    pub focus: f64,
    pub highlight_protect: f64,
    pub black_point: f64,
    pub white_point: f64,
    pub invert: bool,
    pub stf: Option<StfParameters>,
}

/// Clamp into `range`, sending NaN to the lower bound.
fn clamp_finite(value: f64, range: (f64, f64)) -> f64 {
    if value.is_nan() {
        range.0
    } else {
        value.clamp(range.0, range.1)
    }
}

fn check_range(field: &'static str, value: f64, range: (f64, f64)) -> Result<(), ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NonFinite { field, value });
    }
    if value < range.0 || value > range.1 {
        return Err(ParameterError::OutOfRange {
            field,
            value,
            min: range.0,
            max: range.1,
        });
    }
    Ok(())
}
