use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SizerError};

/// An Azure GPU VM size from azure-gpus.toml.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GpuSku {
    pub sku: String,
    pub gpu_model: String,
    /// Memory of a single GPU, in GB.
    pub vram_gb: f64,
    pub gpus_per_vm: u32,
    pub docs_url: String,
}

impl GpuSku {
    /// Largest total memory a single VM of this size can provide.
    pub fn total_vram_gb(&self) -> f64 {
        self.vram_gb * self.gpus_per_vm as f64
    }

    /// Azure CLI command that creates a VM of this size.
    pub fn az_create_command(&self, vm_name: &str) -> String {
        format!(
            "az vm create --name {vm_name} --size {} --image UbuntuLTS",
            self.sku
        )
    }

    fn validate(&self, index: usize) -> Result<()> {
        let entry = if self.sku.trim().is_empty() {
            format!("#{index}")
        } else {
            self.sku.clone()
        };
        let invalid = |reason: &str| SizerError::InvalidCatalog {
            entry: entry.clone(),
            reason: reason.to_string(),
        };
        if self.sku.trim().is_empty() {
            return Err(invalid("sku is empty"));
        }
        if !self.vram_gb.is_finite() || self.vram_gb <= 0.0 {
            return Err(invalid("vram_gb must be positive"));
        }
        if self.gpus_per_vm == 0 {
            return Err(invalid("gpus_per_vm must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SkuFile {
    #[serde(default)]
    sku: Vec<GpuSku>,
}

/// Check every entry of a catalog that did not come through `parse_skus`,
/// e.g. one handed over from JavaScript. Fails on the first bad entry.
pub fn validate_skus(skus: &[GpuSku]) -> Result<()> {
    for (i, sku) in skus.iter().enumerate() {
        sku.validate(i)?;
    }
    Ok(())
}

/// Parse and validate a SKU catalog from a TOML string.
/// Entry order is preserved.
pub fn parse_skus(toml_str: &str) -> Result<Vec<GpuSku>> {
    let file: SkuFile = toml::from_str(toml_str)?;
    validate_skus(&file.sku)?;
    tracing::debug!(count = file.sku.len(), "parsed SKU catalog");
    Ok(file.sku)
}

/// Load a SKU catalog from a file.
pub fn load_skus(path: &Path) -> Result<Vec<GpuSku>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SizerError::Io(format!("{}: {e}", path.display())))?;
    parse_skus(&content)
}

/// Load the bundled azure-gpus.toml from the data/ directory.
pub fn load_bundled_skus() -> Result<Vec<GpuSku>> {
    let toml_str = include_str!("../../../data/azure-gpus.toml");
    parse_skus(toml_str)
}

/// Load `path` if it exists and holds a valid catalog. A missing path
/// silently means bundled; an unreadable or invalid one is logged first.
pub fn load_skus_or_bundled(path: Option<&Path>) -> Result<Vec<GpuSku>> {
    if let Some(path) = path.filter(|p| p.exists()) {
        match load_skus(path) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring SKU override");
            }
        }
    }
    load_bundled_skus()
}

/// Load the SKU catalog: the user override if present and valid, otherwise bundled.
#[cfg(feature = "local-data")]
pub fn load_skus_local() -> Result<Vec<GpuSku>> {
    load_skus_or_bundled(crate::local::data_path("azure-gpus.toml").as_deref())
}
