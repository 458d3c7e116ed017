use serde::{Deserialize, Serialize};

use crate::precision::Precision;

/// Margin applied on top of weights, KV cache and optimizer state for
/// miscellaneous allocations (activations, framework buffers).
pub const MISC_OVERHEAD: f64 = 1.2;

/// Optimizer state as a multiple of the weight size (Adam-family heuristic).
pub const OPTIMIZER_MULTIPLIER: f64 = 2.5;

const BYTES_PER_GB: f64 = 1e9;

/// Transformer shape needed for memory estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelShape {
    /// Parameter count in billions.
    pub params_b: f64,
    pub layers: u32,
    pub hidden: u32,
    /// Maximum supported context. Callers clamp with it; `estimate` ignores it.
    #[serde(default)]
    pub ctx_len: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateConfig {
    pub ctx: u32,
    pub batch: u32,
    pub precision: Precision,
    #[serde(default)]
    pub training: bool,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            ctx: crate::context::DEFAULT_CTX,
            batch: 1,
            precision: Precision::default(),
            training: false,
        }
    }
}

/// Memory breakdown in GB (1 GB = 1e9 bytes), unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub weights_gb: f64,
    pub kv_gb: f64,
    pub total_gb: f64,
}

impl EstimateResult {
    /// Optimizer state included in `total_gb` for the given mode.
    pub fn optimizer_gb(&self, training: bool) -> f64 {
        optimizer_gb(self.weights_gb, training)
    }
}

fn optimizer_gb(weights_gb: f64, training: bool) -> f64 {
    if training {
        OPTIMIZER_MULTIPLIER * weights_gb
    } else {
        0.0
    }
}

/// Estimate memory for a model shape under a given configuration.
///
/// Total over its inputs: no range checks are made, so zero or degenerate
/// values simply propagate through the arithmetic.
pub fn estimate(shape: &ModelShape, config: &EstimateConfig) -> EstimateResult {
    let bytes = config.precision.bytes_per_param();

    let weights_gb = shape.params_b * 1e9 * bytes / BYTES_PER_GB;

    // Keys and values, per layer, per token.
    let kv_gb = 2.0
        * shape.layers as f64
        * config.ctx as f64
        * shape.hidden as f64
        * bytes
        * config.batch as f64
        / BYTES_PER_GB;

    let optimizer = optimizer_gb(weights_gb, config.training);
    let total_gb = MISC_OVERHEAD * (weights_gb + kv_gb + optimizer);

    EstimateResult {
        weights_gb,
        kv_gb,
        total_gb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(params_b: f64, layers: u32, hidden: u32) -> ModelShape {
        ModelShape {
            params_b,
            layers,
            hidden,
            ctx_len: None,
        }
    }

    fn config(ctx: u32, precision: Precision) -> EstimateConfig {
        EstimateConfig {
            ctx,
            batch: 1,
            precision,
            training: false,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    // 1B params at fp16 = 2 GB of weights; tiny KV for one layer.
    #[test]
    fn one_billion_fp16() {
        let est = estimate(&shape(1.0, 1, 1024), &config(256, Precision::Fp16));
        assert!(close(est.weights_gb, 2.0));
        // 2 * 1 * 256 * 1024 * 2 bytes
        assert!(close(est.kv_gb, 1_048_576.0 / 1e9));
        assert!(close(est.total_gb, 1.2 * (est.weights_gb + est.kv_gb)));
    }

    // Llama 3 70B at 8k context, fp16.
    #[test]
    fn llama_70b_fp16_8k() {
        let est = estimate(&shape(70.0, 80, 8192), &config(8192, Precision::Fp16));
        assert!(close(est.weights_gb, 140.0));
        assert!(close(est.kv_gb, 21.474_836_48));
        assert!(close(est.total_gb, 193.769_803_776));
    }

    #[test]
    fn training_adds_optimizer_before_margin() {
        let s = shape(10.0, 1, 1);
        let mut c = config(1, Precision::Fp32);
        let inference = estimate(&s, &c);
        c.training = true;
        let training = estimate(&s, &c);

        assert!(close(training.weights_gb, 40.0));
        assert_eq!(training.weights_gb, inference.weights_gb);
        assert_eq!(training.kv_gb, inference.kv_gb);
        assert_eq!(training.optimizer_gb(true), 2.5 * training.weights_gb);
        assert!(close(
            training.total_gb,
            1.2 * (training.weights_gb + training.kv_gb + 2.5 * training.weights_gb)
        ));
    }

    #[test]
    fn inference_has_no_optimizer_state() {
        let est = estimate(&shape(7.0, 32, 4096), &config(4096, Precision::Int8));
        assert_eq!(est.optimizer_gb(false), 0.0);
    }

    #[test]
    fn optimizer_share_is_exact() {
        let mut c = config(4096, Precision::Fp16);
        c.training = true;
        let est = estimate(&shape(0.1, 12, 768), &c);
        assert_eq!(est.optimizer_gb(true), OPTIMIZER_MULTIPLIER * est.weights_gb);
        assert_eq!(
            est.total_gb,
            MISC_OVERHEAD * (est.weights_gb + est.kv_gb + est.optimizer_gb(true))
        );
    }

    #[test]
    fn batch_scales_kv_only() {
        let s = shape(8.0, 32, 4096);
        let one = estimate(&s, &config(4096, Precision::Fp16));
        let four = estimate(
            &s,
            &EstimateConfig {
                batch: 4,
                ..config(4096, Precision::Fp16)
            },
        );
        assert_eq!(one.weights_gb, four.weights_gb);
        assert!(close(four.kv_gb, 4.0 * one.kv_gb));
    }

    #[test]
    fn int4_halves_int8() {
        let s = shape(13.0, 40, 5120);
        let int8 = estimate(&s, &config(4096, Precision::Int8));
        let int4 = estimate(&s, &config(4096, Precision::Int4));
        assert!(close(int8.weights_gb, 2.0 * int4.weights_gb));
        assert!(close(int8.kv_gb, 2.0 * int4.kv_gb));
    }

    #[test]
    fn bf16_matches_fp16() {
        let s = shape(70.0, 80, 8192);
        let a = estimate(&s, &config(8192, Precision::Fp16));
        let b = estimate(&s, &config(8192, Precision::Bf16));
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let s = shape(405.0, 126, 16384);
        let c = config(131_072, Precision::Fp32);
        assert_eq!(estimate(&s, &c), estimate(&s, &c));
    }

    #[test]
    fn large_context_does_not_overflow() {
        // 126 * 262144 * 16384 overflows u32; the product is taken in f64.
        let est = estimate(
            &shape(405.0, 126, 16384),
            &EstimateConfig {
                ctx: 262_144,
                batch: 64,
                precision: Precision::Fp32,
                training: false,
            },
        );
        assert!(est.kv_gb.is_finite());
        assert!(est.kv_gb > 1.0e5);
    }

    #[test]
    fn ctx_len_is_not_enforced() {
        let mut s = shape(8.0, 32, 4096);
        s.ctx_len = Some(8192);
        let est = estimate(&s, &config(131_072, Precision::Fp16));
        let unclamped = estimate(&shape(8.0, 32, 4096), &config(131_072, Precision::Fp16));
        assert_eq!(est, unclamped);
    }
}
