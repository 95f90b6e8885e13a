//! Stretch transform WASM bindings.
//!
//! Solving, evaluation, expression compilation and LUT preview of a single
//! stretch from the web UI.

use crate::types::JsRgbImage;
use hyperstretch_core::lut::{apply_stretch as core_apply, StretchLut};
use hyperstretch_core::{
    compile, compile_with_symbol, solve, ChannelSelection, CoefficientSet, CompiledExpression,
    Direction, StretchParameters,
};
use wasm_bindgen::prelude::*;

/// Deserialize stretch parameters from a JS object.
///
/// Missing fields take their defaults; field names are camelCase.
pub(crate) fn parameters_from_js(params: JsValue) -> Result<StretchParameters, JsValue> {
    serde_wasm_bindgen::from_value(params)
        .map_err(|e| JsValue::from_str(&format!("Invalid stretch parameters: {}", e)))
}

/// JavaScript-accessible solved stretch.
///
/// # Example (TypeScript)
/// ```typescript
/// const transform = new JsStretchTransform({
///   family: 'generalizedHyperbolic',
///   intensity: 2,
///   amount: 1.5,
///   focus: 0.12,
/// });
///
/// const curve = transform.evaluate_range(0, 1 / 255, 256);
/// const stretched = apply_stretch(image, transform);
///
/// transform.free();
/// stretched.free();
/// ```
#[wasm_bindgen]
pub struct JsStretchTransform {
    inner: CoefficientSet,
    channel: ChannelSelection,
}

#[wasm_bindgen]
impl JsStretchTransform {
    /// Solve a transform from a parameter object.
    ///
    /// # Errors
    /// Returns error if the parameters cannot be deserialized. Out-of-range
    /// values are clamped, not rejected.
    #[wasm_bindgen(constructor)]
    pub fn new(params: JsValue) -> Result<JsStretchTransform, JsValue> {
        let params = parameters_from_js(params)?;
        Ok(Self::from_parameters(&params))
    }

    /// The identity transform.
    pub fn identity() -> JsStretchTransform {
        Self::from_coefficients(
            CoefficientSet::identity(Direction::Forward),
            ChannelSelection::All,
        )
    }

    /// Evaluate at a single normalized value.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.inner.evaluate(x)
    }

    /// Evaluate `count` points `start, start + step, ...`.
    pub fn evaluate_range(&self, start: f64, step: f64, count: usize) -> Vec<f64> {
        self.inner.evaluate_range(start, step, count)
    }

    /// Evaluate every value of a Float64Array.
    pub fn evaluate_values(&self, values: Vec<f64>) -> Vec<f64> {
        let mut values = values;
        self.inner.evaluate_in_place(&mut values);
        values
    }

    /// Family actually built, as its short code.
    #[wasm_bindgen(getter)]
    pub fn family(&self) -> String {
        self.inner.family.code().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn is_inverse(&self) -> bool {
        self.inner.is_inverse()
    }

    /// Whether the forward/inverse pair is exact for these parameters.
    #[wasm_bindgen(getter)]
    pub fn is_true_inverse(&self) -> bool {
        self.inner.is_true_inverse
    }

    /// Breakpoints `[LPT, SPT, HPT]`.
    pub fn breakpoints(&self) -> Vec<f64> {
        let bp = self.inner.breakpoints;
        vec![bp.lpt, bp.spt, bp.hpt]
    }

    /// Conditional expression over `$T`.
    pub fn expression(&self) -> String {
        compile(&self.inner).expression
    }

    /// Symbol declarations for `expression()`.
    pub fn symbols(&self) -> String {
        compile(&self.inner).symbols()
    }

    /// Compile against a custom pixel symbol.
    pub fn compile(&self, pixel: &str) -> JsCompiledExpression {
        JsCompiledExpression {
            inner: compile_with_symbol(&self.inner, pixel),
        }
    }

    /// Full coefficient set as a plain JS object.
    pub fn coefficients(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize coefficients: {}", e)))
    }

    /// Get the 256-entry preview LUT.
    pub fn get_lut(&self) -> Vec<u8> {
        StretchLut::from_coefficients(&self.inner).lut.to_vec()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {
        // Dropping self releases the memory
    }
}

impl JsStretchTransform {
    pub(crate) fn from_parameters(params: &StretchParameters) -> Self {
        Self::from_coefficients(solve(params), params.channel)
    }

    pub(crate) fn from_coefficients(inner: CoefficientSet, channel: ChannelSelection) -> Self {
        Self { inner, channel }
    }

    pub(crate) fn coefficient_set(&self) -> &CoefficientSet {
        &self.inner
    }
}

/// A compiled expression and its symbol bindings.
#[wasm_bindgen]
pub struct JsCompiledExpression {
    inner: CompiledExpression,
}

#[wasm_bindgen]
impl JsCompiledExpression {
    #[wasm_bindgen(getter)]
    pub fn expression(&self) -> String {
        self.inner.expression.clone()
    }

    /// Symbol declarations as `name=value, ...`.
    pub fn symbols(&self) -> String {
        self.inner.symbols()
    }

    /// Value bound to `name`, if the expression uses it.
    pub fn binding(&self, name: &str) -> Option<f64> {
        self.inner.binding(name)
    }

    /// Bound symbol names in first-use order.
    pub fn names(&self) -> Vec<String> {
        self.inner.bindings.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Bindings as a `{ name: value }` object.
    pub fn bindings(&self) -> Result<js_sys::Object, JsValue> {
        let object = js_sys::Object::new();
        for (name, value) in &self.inner.bindings {
            js_sys::Reflect::set(
                &object,
                &JsValue::from_str(name),
                &JsValue::from_f64(*value),
            )?;
        }
        Ok(object)
    }

    #[wasm_bindgen(getter)]
    pub fn conditional_count(&self) -> usize {
        self.inner.conditional_count()
    }
}

/// Apply a stretch to an image through its 8-bit preview LUT.
///
/// Only the channels selected by the transform's parameters are touched.
#[wasm_bindgen]
pub fn apply_stretch(image: &JsRgbImage, transform: &JsStretchTransform) -> JsRgbImage {
    let mut pixels = image.pixels();
    let lut = StretchLut::from_coefficients(transform.coefficient_set());
    core_apply(&mut pixels, &lut, transform.channel.mask());
    JsRgbImage::new(image.width(), image.height(), pixels)
}

/// Check parameters strictly, without clamping.
///
/// # Errors
/// Returns the first violated bound or ordering as a message.
#[wasm_bindgen]
pub fn validate_parameters(params: JsValue) -> Result<(), JsValue> {
    let params = parameters_from_js(params)?;
    params
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Canonical key of a parameter object.
#[wasm_bindgen]
pub fn canonical_key(params: JsValue) -> Result<String, JsValue> {
    Ok(parameters_from_js(params)?.canonical_key())
}
