//! Preview lookup tables.
//!
//! Previews work on 8-bit RGB buffers, where a 256-entry table is cheaper
//! than evaluating the piecewise transform per pixel. Output is clamped to
//! `[0, 255]` here, unlike the evaluator itself.

use crate::solver::CoefficientSet;

// ============================================================================
// LUT Type
// ============================================================================

/// Pre-computed 256-entry lookup table for a stretch transform.
#[derive(Debug, Clone)]
pub struct StretchLut {
    /// LUT values: lut[input] = output
    pub lut: [u8; 256],
}

impl StretchLut {
    /// Sample a coefficient set at the 256 8-bit input levels.
    pub fn from_coefficients(coefficients: &CoefficientSet) -> Self {
        let mut lut = [0u8; 256];
        for (i, lut_value) in lut.iter_mut().enumerate() {
            let y = coefficients.evaluate(i as f64 / 255.0);
            *lut_value = (y * 255.0).clamp(0.0, 255.0).round() as u8;
        }
        Self { lut }
    }

    /// Create identity LUT (no change).
    pub fn identity() -> Self {
        let mut lut = [0u8; 256];
        for (i, lut_value) in lut.iter_mut().enumerate() {
            *lut_value = i as u8;
        }
        Self { lut }
    }

    /// Check if this LUT is identity.
    pub fn is_identity(&self) -> bool {
        self.lut.iter().enumerate().all(|(i, &v)| v == i as u8)
    }
}

impl Default for StretchLut {
    fn default() -> Self {
        Self::identity()
    }
}

// ============================================================================
// Application
// ============================================================================

/// Apply a stretch LUT to RGB pixels in place.
///
/// `mask` selects which of the R, G, B channels are touched.
pub fn apply_stretch(pixels: &mut [u8], lut: &StretchLut, mask: [bool; 3]) {
    if lut.is_identity() || mask == [false; 3] {
        return;
    }

    for chunk in pixels.chunks_exact_mut(3) {
        for (value, &enabled) in chunk.iter_mut().zip(mask.iter()) {
            if enabled {
                *value = lut.lut[*value as usize];
            }
        }
    }
}
