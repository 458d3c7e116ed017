pub mod context;
pub mod error;
pub mod estimate;
#[cfg(feature = "local-data")]
pub mod local;
pub mod model;
pub mod precision;
pub mod select;
pub mod sku;

pub use error::{Result, SizerError};
pub use estimate::{estimate, EstimateConfig, EstimateResult, ModelShape};
pub use model::ModelInfo;
pub use precision::Precision;
pub use select::{select_sku, size, Selection, SizingResult};
pub use sku::GpuSku;
