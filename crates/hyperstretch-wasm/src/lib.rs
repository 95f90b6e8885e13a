//! Hyperstretch WASM - WebAssembly bindings for the stretch engine
//!
//! This crate exposes hyperstretch-core to JavaScript/TypeScript
//! applications.
//!
//! # Module Structure
//!
//! - `stretch` - Solving, evaluation, expression compilation, LUT preview
//! - `session` - Stateful editing session with a recalculation cache
//! - `statistics` - Screen transfer function parameters from pixels
//! - `types` - WASM-compatible wrapper types for image data
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsStretchTransform, apply_stretch } from '@hyperstretch/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const transform = new JsStretchTransform({ amount: 2, focus: 0.1 });
//! console.log(transform.expression());
//! ```

use wasm_bindgen::prelude::*;

mod logger;
mod session;
mod statistics;
mod stretch;
mod types;

// Re-export public types
pub use session::JsStretchSession;
pub use statistics::{compute_stf, JsStfParameters};
pub use stretch::{
    apply_stretch, canonical_key, validate_parameters, JsCompiledExpression, JsStretchTransform,
};
pub use types::JsRgbImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logger::install(log::LevelFilter::Info);
}

/// Set the console log level ("error", "warn", "info", "debug", "trace", "off").
#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    logger::install(logger::level_from_str(level));
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
