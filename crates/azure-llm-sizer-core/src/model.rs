use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SizerError};
use crate::estimate::ModelShape;

/// Model preselected when nothing else is requested.
pub const DEFAULT_MODEL_ID: &str = "meta-llama/Meta-Llama-3-70B";

/// A model entry from models.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub params_b: f64,
    pub layers: u32,
    pub hidden: u32,
    /// Fraction of parameters active per token for MoE models, 0.0 for dense.
    #[serde(default)]
    pub moe_active_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx_len: Option<u32>,
}

impl ModelInfo {
    pub fn shape(&self) -> ModelShape {
        ModelShape {
            params_b: self.params_b,
            layers: self.layers,
            hidden: self.hidden,
            ctx_len: self.ctx_len,
        }
    }

    /// "meta-llama/Meta-Llama-3-70B" -> "Meta-Llama-3-70B".
    pub fn short_name(&self) -> &str {
        self.model_id.rsplit('/').next().unwrap_or(&self.model_id)
    }

    pub fn is_moe(&self) -> bool {
        self.moe_active_ratio > 0.0
    }

    pub fn clamp_ctx(&self, requested: u32) -> u32 {
        crate::context::clamp_ctx(requested, self.ctx_len)
    }

    /// Format a billions-of-params figure as "70B", "3.8B", "685B".
    pub fn fmt_params(params_b: f64) -> String {
        if params_b.fract() == 0.0 || params_b >= 100.0 {
            format!("{:.0}B", params_b)
        } else {
            format!("{:.1}B", params_b)
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| SizerError::InvalidCatalog {
            entry: self.model_id.clone(),
            reason: reason.to_string(),
        };
        if self.model_id.trim().is_empty() {
            return Err(invalid("model_id is empty"));
        }
        if !self.params_b.is_finite() || self.params_b <= 0.0 {
            return Err(invalid("params_b must be positive"));
        }
        if self.layers == 0 {
            return Err(invalid("layers must be positive"));
        }
        if self.hidden == 0 {
            return Err(invalid("hidden must be positive"));
        }
        if !(0.0..=1.0).contains(&self.moe_active_ratio) {
            return Err(invalid("moe_active_ratio must be within [0, 1]"));
        }
        if self.ctx_len == Some(0) {
            return Err(invalid("ctx_len must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    model: Vec<ModelInfo>,
}

/// Parse and validate a model catalog from a TOML string.
pub fn parse_models(toml_str: &str) -> Result<Vec<ModelInfo>> {
    let file: ModelFile = toml::from_str(toml_str)?;
    for m in &file.model {
        m.validate()?;
    }
    tracing::debug!(count = file.model.len(), "parsed model catalog");
    Ok(file.model)
}

/// Load a model catalog from a file.
pub fn load_models(path: &Path) -> Result<Vec<ModelInfo>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SizerError::Io(format!("{}: {e}", path.display())))?;
    parse_models(&content)
}

/// Load the bundled models.toml from the data/ directory.
pub fn load_bundled_models() -> Result<Vec<ModelInfo>> {
    let toml_str = include_str!("../../../data/models.toml");
    parse_models(toml_str)
}

/// Load `path` if it exists and holds a valid catalog, otherwise the bundled one.
pub fn load_models_or_bundled(path: Option<&Path>) -> Result<Vec<ModelInfo>> {
    if let Some(path) = path.filter(|p| p.exists()) {
        match load_models(path) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring model override");
            }
        }
    }
    load_bundled_models()
}

/// Load the model catalog: the user override if present and valid, otherwise bundled.
#[cfg(feature = "local-data")]
pub fn load_models_local() -> Result<Vec<ModelInfo>> {
    load_models_or_bundled(crate::local::data_path("models.toml").as_deref())
}

/// Find a model by full id or by its short name, ignoring case.
pub fn find_model<'a>(models: &'a [ModelInfo], query: &str) -> Option<&'a ModelInfo> {
    let q = query.trim().to_lowercase();
    models.iter().find(|m| {
        m.model_id.to_lowercase() == q || m.short_name().to_lowercase() == q
    })
}

/// Like `find_model`, but a miss is a `ModelNotFound` error.
pub fn resolve_model<'a>(models: &'a [ModelInfo], query: &str) -> Result<&'a ModelInfo> {
    find_model(models, query).ok_or_else(|| SizerError::ModelNotFound(query.trim().to_string()))
}

/// Catalog ordering for model listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSort {
    #[default]
    SizeDesc,
    SizeAsc,
    Name,
}

impl FromStr for ModelSort {
    type Err = SizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "size_desc" => Ok(ModelSort::SizeDesc),
            "size_asc" => Ok(ModelSort::SizeAsc),
            "name" => Ok(ModelSort::Name),
            _ => Err(SizerError::UnknownSort(s.to_string())),
        }
    }
}

/// Stable sort; equal sizes keep catalog order.
pub fn sort_models(models: &mut [ModelInfo], sort: ModelSort) {
    match sort {
        ModelSort::SizeDesc => models.sort_by(|a, b| b.params_b.total_cmp(&a.params_b)),
        ModelSort::SizeAsc => models.sort_by(|a, b| a.params_b.total_cmp(&b.params_b)),
        ModelSort::Name => models.sort_by(|a, b| {
            let ord = a.model_id.to_lowercase().cmp(&b.model_id.to_lowercase());
            if ord == Ordering::Equal {
                a.model_id.cmp(&b.model_id)
            } else {
                ord
            }
        }),
    }
}

/// Models whose id contains `term`, ignoring case. Empty term matches all.
pub fn filter_models<'a>(models: &'a [ModelInfo], term: &str) -> Vec<&'a ModelInfo> {
    let term = term.trim().to_lowercase();
    models
        .iter()
        .filter(|m| m.model_id.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, params_b: f64) -> ModelInfo {
        ModelInfo {
            model_id: id.to_string(),
            params_b,
            layers: 32,
            hidden: 4096,
            moe_active_ratio: 0.0,
            ctx_len: None,
        }
    }

    #[test]
    fn short_name_strips_org() {
        assert_eq!(model("meta-llama/Meta-Llama-3-70B", 70.0).short_name(), "Meta-Llama-3-70B");
        assert_eq!(model("gpt2", 0.1).short_name(), "gpt2");
    }

    #[test]
    fn fmt_params_drops_needless_decimals() {
        assert_eq!(ModelInfo::fmt_params(70.0), "70B");
        assert_eq!(ModelInfo::fmt_params(3.8), "3.8B");
        assert_eq!(ModelInfo::fmt_params(685.0), "685B");
        assert_eq!(ModelInfo::fmt_params(123.4), "123B");
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[[model]]
model_id = "org/Tiny-1B"
params_b = 1
layers = 16
hidden = 2048
"#;
        let models = parse_models(toml).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].moe_active_ratio, 0.0);
        assert!(models[0].ctx_len.is_none());
        assert!(!models[0].is_moe());
    }

    #[test]
    fn rejects_zero_layers() {
        let toml = r#"
[[model]]
model_id = "org/Broken"
params_b = 7
layers = 0
hidden = 4096
"#;
        let err = parse_models(toml).unwrap_err();
        assert!(matches!(err, SizerError::InvalidCatalog { ref entry, .. } if entry == "org/Broken"));
    }

    #[test]
    fn rejects_out_of_range_moe_ratio() {
        let toml = r#"
[[model]]
model_id = "org/Moe"
params_b = 7
layers = 32
hidden = 4096
moe_active_ratio = 1.5
"#;
        assert!(parse_models(toml).is_err());
    }

    #[test]
    fn shape_carries_ctx_len() {
        let mut m = model("org/m", 8.0);
        m.ctx_len = Some(8192);
        let s = m.shape();
        assert_eq!(s.params_b, 8.0);
        assert_eq!(s.ctx_len, Some(8192));
        assert_eq!(m.clamp_ctx(131_072), 8192);
    }

    #[test]
    fn sort_options_parse() {
        assert_eq!("size_desc".parse::<ModelSort>().unwrap(), ModelSort::SizeDesc);
        assert_eq!("size-asc".parse::<ModelSort>().unwrap(), ModelSort::SizeAsc);
        assert_eq!("Name".parse::<ModelSort>().unwrap(), ModelSort::Name);
        assert!("largest".parse::<ModelSort>().is_err());
    }

    #[test]
    fn sort_by_name_ignores_case() {
        let mut models = vec![model("b/zeta", 1.0), model("B/Alpha", 2.0), model("a/mid", 3.0)];
        sort_models(&mut models, ModelSort::Name);
        let ids: Vec<&str> = models.iter().map(|m| m.model_id.as_str()).collect();
        assert_eq!(ids, ["a/mid", "B/Alpha", "b/zeta"]);
    }

    #[test]
    fn invalid_override_falls_back_to_bundled() {
        let path = std::env::temp_dir()
            .join(format!("azure-llm-sizer-{}-bad-models.toml", std::process::id()));
        std::fs::write(&path, "[[model]]\nmodel_id = \"org/Broken\"\nparams_b = 7\nlayers = 0\nhidden = 4096\n")
            .unwrap();
        let models = load_models_or_bundled(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(models, load_bundled_models().unwrap());
    }

    #[test]
    fn valid_override_replaces_bundled() {
        let path = std::env::temp_dir()
            .join(format!("azure-llm-sizer-{}-good-models.toml", std::process::id()));
        std::fs::write(&path, "[[model]]\nmodel_id = \"org/Tiny-1B\"\nparams_b = 1\nlayers = 16\nhidden = 2048\n")
            .unwrap();
        let models = load_models_or_bundled(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].model_id, "org/Tiny-1B");
    }
}
