//! Interactive stretch session bindings.
//!
//! A session owns one parameter set and one recalculation cache, so slider
//! drags that do not change the canonical key skip the solver.

use crate::statistics::{stf_for_pixels, JsStfParameters};
use crate::stretch::{parameters_from_js, JsStretchTransform};
use hyperstretch_core::{compile, StretchCache, StretchParameters};
use log::debug;
use wasm_bindgen::prelude::*;

/// Stateful stretch editor for the web UI.
///
/// # Example (TypeScript)
/// ```typescript
/// const session = new JsStretchSession();
/// session.set_parameters({ amount: 2, focus: 0.1 });
/// const preview = apply_stretch(image, session.transform());
/// ```
#[wasm_bindgen]
#[derive(Default)]
pub struct JsStretchSession {
    params: StretchParameters,
    cache: StretchCache,
}

#[wasm_bindgen]
impl JsStretchSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsStretchSession {
        Self::default()
    }

    /// Replace the session parameters.
    ///
    /// Screen transfer statistics are kept when `params.stf` is absent or
    /// null; use `clear_stf()` to drop them.
    ///
    /// # Errors
    /// Returns error if the parameters cannot be deserialized.
    pub fn set_parameters(&mut self, params: JsValue) -> Result<(), JsValue> {
        let params = parameters_from_js(params)?;
        self.update(params);
        Ok(())
    }

    /// Current parameters as a plain JS object.
    pub fn parameters(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.params)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize parameters: {}", e)))
    }

    /// Feed the screen transfer function from image pixels, using the
    /// session's channel selection and linking.
    ///
    /// Returns false if the buffer holds no complete pixel.
    pub fn update_statistics(&mut self, pixels: &[u8]) -> bool {
        match stf_for_pixels(pixels, self.params.channel, self.params.linked) {
            Some(stf) => {
                self.params.stf = Some(stf);
                true
            }
            None => false,
        }
    }

    /// Use precomputed auto-stretch parameters.
    pub fn set_stf(&mut self, stf: &JsStfParameters) {
        self.params.stf = Some(stf.parameters());
    }

    /// Forget the screen transfer statistics. The STF family falls back
    /// to the identity until statistics are supplied again.
    pub fn clear_stf(&mut self) {
        debug!("session statistics cleared");
        self.params.stf = None;
    }

    /// Solved transform for the current parameters.
    pub fn transform(&mut self) -> JsStretchTransform {
        let channel = self.params.channel;
        let coefficients = self.cache.get_or_solve(&self.params).clone();
        JsStretchTransform::from_coefficients(coefficients, channel)
    }

    pub fn evaluate(&mut self, x: f64) -> f64 {
        self.cache.get_or_solve(&self.params).evaluate(x)
    }

    /// Conditional expression for the current parameters.
    pub fn expression(&mut self) -> String {
        compile(self.cache.get_or_solve(&self.params)).expression
    }

    /// Symbol declarations for `expression()`.
    pub fn symbols(&mut self) -> String {
        compile(self.cache.get_or_solve(&self.params)).symbols()
    }

    #[wasm_bindgen(getter)]
    pub fn canonical_key(&self) -> String {
        self.params.canonical_key()
    }

    /// Drop the cached coefficients.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    #[wasm_bindgen(getter)]
    pub fn cache_hits(&self) -> f64 {
        self.cache.hits() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn cache_misses(&self) -> f64 {
        self.cache.misses() as f64
    }
}

impl JsStretchSession {
    pub(crate) fn update(&mut self, params: StretchParameters) {
        debug!("session parameters: {}", params.canonical_key());
        // Statistics survive parameter edits until refreshed.
        let stf = self.params.stf.take();
        self.params = StretchParameters {
            stf: params.stf.or(stf),
            ..params
        };
    }
}
