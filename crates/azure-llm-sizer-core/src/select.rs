use serde::{Deserialize, Serialize};

use crate::estimate::{estimate, EstimateConfig, EstimateResult, ModelShape};
use crate::sku::GpuSku;

/// Chosen VM size and how many of its GPUs the workload occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub gpus: u32,
    pub sku: Option<GpuSku>,
}

impl Selection {
    fn none() -> Self {
        Self { gpus: 0, sku: None }
    }
}

/// Pick the smallest-VRAM SKU whose single VM holds `total_gb`.
///
/// Entries are scanned in ascending `vram_gb`. The sort is stable, so SKUs
/// with equal VRAM are tried in catalog order. The first entry where
/// `ceil(total_gb / vram_gb) <= gpus_per_vm` wins. When nothing fits (or
/// the catalog is empty) the result is `gpus = 0` with no SKU.
pub fn select_sku(total_gb: f64, catalog: &[GpuSku]) -> Selection {
    let mut ordered: Vec<&GpuSku> = catalog.iter().collect();
    ordered.sort_by(|a, b| a.vram_gb.total_cmp(&b.vram_gb));

    for sku in ordered {
        let needed = (total_gb / sku.vram_gb).ceil();
        tracing::trace!(sku = %sku.sku, vram_gb = sku.vram_gb, needed, "candidate");
        // Compare in f64 so huge requirements can't wrap when cast.
        if needed <= sku.gpus_per_vm as f64 {
            tracing::debug!(sku = %sku.sku, gpus = needed, total_gb, "selected SKU");
            return Selection {
                gpus: needed.max(0.0) as u32,
                sku: Some(sku.clone()),
            };
        }
    }

    tracing::debug!(total_gb, "no SKU fits on a single VM");
    Selection::none()
}

/// Memory breakdown plus the recommended VM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    #[serde(flatten)]
    pub memory: EstimateResult,
    pub gpus: u32,
    pub sku: Option<GpuSku>,
}

impl SizingResult {
    /// Memory each occupied GPU holds, when a SKU was chosen.
    pub fn memory_per_gpu_gb(&self) -> Option<f64> {
        match &self.sku {
            Some(_) if self.gpus > 0 => Some(self.memory.total_gb / self.gpus as f64),
            _ => None,
        }
    }

    /// Fraction of the VM's GPU memory claimed, counted in whole GPUs.
    /// 0.0 when nothing fits.
    pub fn vram_utilization(&self) -> f64 {
        match &self.sku {
            Some(sku) => self.gpus as f64 / sku.gpus_per_vm as f64,
            None => 0.0,
        }
    }
}

/// Estimate memory and select a SKU in one step.
pub fn size(shape: &ModelShape, config: &EstimateConfig, catalog: &[GpuSku]) -> SizingResult {
    let memory = estimate(shape, config);
    let Selection { gpus, sku } = select_sku(memory.total_gb, catalog);
    SizingResult { memory, gpus, sku }
}
