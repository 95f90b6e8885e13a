//! Screen transfer function statistics bindings.

use hyperstretch_core::{ChannelSelection, Rgb8Statistics, StfParameters};
use wasm_bindgen::prelude::*;

/// Auto-stretch parameters computed from image statistics.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsStfParameters {
    inner: StfParameters,
}

#[wasm_bindgen]
impl JsStfParameters {
    /// Shadow clipping point `c0`.
    #[wasm_bindgen(getter)]
    pub fn shadow_clip(&self) -> f64 {
        self.inner.shadow_clip
    }

    /// Midtone balance `m`.
    #[wasm_bindgen(getter)]
    pub fn midtone(&self) -> f64 {
        self.inner.midtone
    }

    /// Highlight clipping point `c1`.
    #[wasm_bindgen(getter)]
    pub fn highlight_clip(&self) -> f64 {
        self.inner.highlight_clip
    }
}

impl JsStfParameters {
    pub(crate) fn parameters(&self) -> StfParameters {
        self.inner
    }
}

/// Convert a u8 channel value to a channel selection.
///
/// Values:
/// - 0 = All channels
/// - 1 = Red
/// - 2 = Green
/// - 3 = Blue
///
/// Any other value defaults to All.
pub(crate) fn channel_from_u8(value: u8) -> ChannelSelection {
    match value {
        1 => ChannelSelection::Red,
        2 => ChannelSelection::Green,
        3 => ChannelSelection::Blue,
        _ => ChannelSelection::All,
    }
}

pub(crate) fn stf_for_pixels(
    pixels: &[u8],
    selection: ChannelSelection,
    linked: bool,
) -> Option<StfParameters> {
    let stats = Rgb8Statistics::from_pixels(pixels);
    StfParameters::from_provider(&stats, selection, linked)
}

/// Compute auto-stretch parameters from RGB pixel data.
///
/// # Arguments
/// * `pixels` - RGB pixel data (3 bytes per pixel)
/// * `channel` - 0 = all, 1 = red, 2 = green, 3 = blue
/// * `linked` - Use averaged statistics for all channels
///
/// # Errors
/// Returns error if the buffer holds no complete pixel.
#[wasm_bindgen]
pub fn compute_stf(pixels: &[u8], channel: u8, linked: bool) -> Result<JsStfParameters, JsValue> {
    stf_for_pixels(pixels, channel_from_u8(channel), linked)
        .map(|inner| JsStfParameters { inner })
        .ok_or_else(|| JsValue::from_str("No pixel data for statistics"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark background with a faint gradient.
    fn sky() -> Vec<u8> {
        let mut pixels = Vec::new();
        for i in 0..100u8 {
            let v = 10 + i % 8;
            pixels.extend_from_slice(&[v, v + 2, v + 4]);
        }
        pixels
    }

    #[test]
    fn test_channel_from_u8() {
        assert_eq!(channel_from_u8(0), ChannelSelection::All);
        assert_eq!(channel_from_u8(1), ChannelSelection::Red);
        assert_eq!(channel_from_u8(2), ChannelSelection::Green);
        assert_eq!(channel_from_u8(3), ChannelSelection::Blue);
        assert_eq!(channel_from_u8(200), ChannelSelection::All);
    }

    #[test]
    fn test_stf_for_dark_image() {
        let stf = stf_for_pixels(&sky(), ChannelSelection::All, true).unwrap();
        let js = JsStfParameters { inner: stf };
        assert!(js.shadow_clip() < 10.0 / 255.0 + 1e-9);
        assert!(js.midtone() < 0.5, "dark image needs a strong stretch");
        assert_eq!(js.highlight_clip(), 1.0);
    }

    #[test]
    fn test_unlinked_channels_differ() {
        let red = stf_for_pixels(&sky(), ChannelSelection::Red, false).unwrap();
        let blue = stf_for_pixels(&sky(), ChannelSelection::Blue, false).unwrap();
        assert!(blue.shadow_clip > red.shadow_clip);
        // Linking ignores the selection
        let linked = stf_for_pixels(&sky(), ChannelSelection::Red, true).unwrap();
        assert_eq!(linked, stf_for_pixels(&sky(), ChannelSelection::All, true).unwrap());
    }

    #[test]
    fn test_empty_buffer_has_no_stf() {
        assert!(stf_for_pixels(&[], ChannelSelection::All, true).is_none());
    }

    #[test]
    fn test_compute_stf() {
        let js = compute_stf(&sky(), 0, true).ok().unwrap();
        assert_eq!(
            js.parameters(),
            stf_for_pixels(&sky(), ChannelSelection::All, true).unwrap()
        );
    }
}
