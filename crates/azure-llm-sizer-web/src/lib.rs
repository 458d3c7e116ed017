use wasm_bindgen::prelude::*;

use azure_llm_sizer_core::context;
use azure_llm_sizer_core::model::{self, ModelInfo};
use azure_llm_sizer_core::sku::{self, GpuSku};
use azure_llm_sizer_core::{EstimateConfig, ModelShape};

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

/// A caller-supplied SKU list, only if every entry passes the catalog checks.
fn skus_from_js(value: JsValue) -> Option<Vec<GpuSku>> {
    let skus: Vec<GpuSku> = serde_wasm_bindgen::from_value(value).ok()?;
    sku::validate_skus(&skus).ok()?;
    Some(skus)
}

// ---------------------------------------------------------------------------
// Memory estimation and SKU selection
// ---------------------------------------------------------------------------

/// Estimate memory for `{params_b, layers, hidden}` under
/// `{ctx, batch, precision, training?}`. Returns `{weights_gb, kv_gb, total_gb}`
/// or null when either argument is malformed (e.g. an unknown precision key).
#[wasm_bindgen]
pub fn estimate(shape: JsValue, config: JsValue) -> JsValue {
    let shape: ModelShape = match serde_wasm_bindgen::from_value(shape) {
        Ok(s) => s,
        Err(_) => return JsValue::NULL,
    };
    let config: EstimateConfig = match serde_wasm_bindgen::from_value(config) {
        Ok(c) => c,
        Err(_) => return JsValue::NULL,
    };
    to_js(&azure_llm_sizer_core::estimate(&shape, &config))
}

/// Pick a SKU for `total_gb` from an array of SKU objects.
/// Returns `{gpus, sku}` with `sku` null when nothing fits, or null when
/// an entry is malformed (non-positive `vram_gb`, zero `gpus_per_vm`, empty `sku`).
#[wasm_bindgen]
pub fn select_sku(total_gb: f64, skus: JsValue) -> JsValue {
    let Some(skus) = skus_from_js(skus) else {
        return JsValue::NULL;
    };
    to_js(&azure_llm_sizer_core::select_sku(total_gb, &skus))
}

/// Estimate and select in one call. `skus` may be null to use the bundled catalog.
#[wasm_bindgen]
pub fn size(shape: JsValue, config: JsValue, skus: JsValue) -> JsValue {
    let shape: ModelShape = match serde_wasm_bindgen::from_value(shape) {
        Ok(s) => s,
        Err(_) => return JsValue::NULL,
    };
    let config: EstimateConfig = match serde_wasm_bindgen::from_value(config) {
        Ok(c) => c,
        Err(_) => return JsValue::NULL,
    };
    let skus: Vec<GpuSku> = if skus.is_null() || skus.is_undefined() {
        match sku::load_bundled_skus() {
            Ok(s) => s,
            Err(_) => return JsValue::NULL,
        }
    } else {
        match skus_from_js(skus) {
            Some(s) => s,
            None => return JsValue::NULL,
        }
    };
    to_js(&azure_llm_sizer_core::size(&shape, &config, &skus))
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

/// Bundled model catalog, sorted by `sort` ("size_desc", "size_asc", "name").
#[wasm_bindgen]
pub fn get_models(sort: &str) -> JsValue {
    let mut models: Vec<ModelInfo> = match model::load_bundled_models() {
        Ok(m) => m,
        Err(_) => return JsValue::NULL,
    };
    let sort = sort.parse().unwrap_or_default();
    model::sort_models(&mut models, sort);
    to_js(&models)
}

#[wasm_bindgen]
pub fn get_skus() -> JsValue {
    match sku::load_bundled_skus() {
        Ok(s) => to_js(&s),
        Err(_) => JsValue::NULL,
    }
}

/// Look up a bundled model by id or short name. Returns the model or null.
#[wasm_bindgen]
pub fn find_model(query: &str) -> JsValue {
    let models = match model::load_bundled_models() {
        Ok(m) => m,
        Err(_) => return JsValue::NULL,
    };
    match model::find_model(&models, query) {
        Some(m) => to_js(m),
        None => JsValue::NULL,
    }
}

// ---------------------------------------------------------------------------
// Context length
// ---------------------------------------------------------------------------

/// Parse "128k" / "4096". Returns the token count or null.
#[wasm_bindgen]
pub fn parse_ctx(input: &str) -> JsValue {
    match context::parse_ctx(input) {
        Ok(v) => JsValue::from_f64(v as f64),
        Err(_) => JsValue::NULL,
    }
}

#[wasm_bindgen]
pub fn fmt_ctx(ctx: u32) -> String {
    context::fmt_ctx(ctx)
}

#[wasm_bindgen]
pub fn ctx_options() -> Vec<u32> {
    context::CTX_OPTIONS.to_vec()
}

/// Clamp a requested context to a model maximum; pass 0 for "no maximum".
#[wasm_bindgen]
pub fn clamp_ctx(requested: u32, ctx_len: u32) -> u32 {
    context::clamp_ctx(requested, (ctx_len > 0).then_some(ctx_len))
}
