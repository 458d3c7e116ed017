use crate::error::{Result, SizerError};

/// Context lengths offered by the sizing form, 1k through 256k.
pub const CTX_OPTIONS: &[u32] = &[
    1024, 2048, 4096, 8192, 16_384, 32_768, 65_536, 131_072, 262_144,
];

pub const DEFAULT_CTX: u32 = 131_072;

/// Parse a context length like "4096" or "128k" (k = 1024).
pub fn parse_ctx(input: &str) -> Result<u32> {
    let lower = input.trim().to_ascii_lowercase();
    let (digits, scale) = match lower.strip_suffix('k') {
        Some(d) => (d, 1024u32),
        None => (lower.as_str(), 1u32),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SizerError::InvalidContext(input.to_string()));
    }
    let value = digits
        .parse::<u32>()
        .ok()
        .and_then(|v| v.checked_mul(scale))
        .filter(|&v| v > 0)
        .ok_or_else(|| SizerError::InvalidContext(input.to_string()))?;
    Ok(value)
}

/// Format a context length the way the form labels it: "128k", "512".
pub fn fmt_ctx(ctx: u32) -> String {
    if ctx < 1024 {
        ctx.to_string()
    } else if ctx % 1024 == 0 {
        format!("{}k", ctx / 1024)
    } else {
        format!("{}k", ctx as f64 / 1024.0)
    }
}

/// Clamp a requested context to a model's maximum, when it has one.
pub fn clamp_ctx(requested: u32, ctx_len: Option<u32>) -> u32 {
    match ctx_len {
        Some(max) => requested.min(max),
        None => requested,
    }
}
