use std::path::{Path, PathBuf};

use azure_llm_sizer_core::{
    context::{self, DEFAULT_CTX},
    model::{self, ModelInfo, ModelSort, DEFAULT_MODEL_ID},
    sku::{self, GpuSku},
    size, EstimateConfig, ModelShape, Precision, SizingResult,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::Style;

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(252).bold() }  // bright gray, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_tree() -> Style   { Style::new().color256(245) }         // mid gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_ok() -> Style     { Style::new().color256(114) }         // green
fn s_warn() -> Style   { Style::new().color256(214) }         // amber
fn s_err() -> Style    { Style::new().color256(167) }         // red
fn s_accent() -> Style { Style::new().color256(109) }         // teal accent
fn s_param() -> Style  { Style::new().color256(139) }         // mauve

fn sep(width: usize) -> String {
    s_tree().apply_to("\u{2500}".repeat(width)).to_string()
}

fn fmt_gb(v: f64) -> String {
    format!("{v:.2} GB")
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "azure-llm-sizer",
    about = "Estimate LLM GPU memory and pick the smallest Azure GPU VM that fits",
    version,
    after_help = "examples:\n  \
        azure-llm-sizer                                  (Meta-Llama-3-70B, fp16, 128k)\n  \
        azure-llm-sizer Llama-3.3-70B-Instruct -p int8 -c 32k\n  \
        azure-llm-sizer size mistralai/Mixtral-8x7B-v0.1 --training\n  \
        azure-llm-sizer estimate --params-b 13 --layers 40 --hidden 5120\n  \
        azure-llm-sizer models qwen --sort size_asc\n  \
        azure-llm-sizer skus"
)]
struct Cli {
    /// Model id or short name (defaults to Meta-Llama-3-70B).
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Model catalog TOML to use instead of the bundled one.
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    /// SKU catalog TOML to use instead of the bundled one.
    #[arg(long, global = true)]
    skus: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct RunArgs {
    #[arg(long, short, default_value = "fp16")]
    precision: Precision,

    /// Context length, e.g. 4096 or 128k. Clamped to the model maximum.
    #[arg(long, short, default_value = "128k", value_parser = context::parse_ctx)]
    ctx: u32,

    #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    batch: u32,

    /// Reserve optimizer state (2.5x weights) for training.
    #[arg(long)]
    training: bool,

    #[arg(long, short)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Size a model from the catalog.
    Size {
        model: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Size a raw model shape.
    Estimate {
        /// Parameter count in billions.
        #[arg(long)]
        params_b: f64,
        #[arg(long)]
        layers: u32,
        #[arg(long)]
        hidden: u32,
        #[command(flatten)]
        run: RunArgs,
    },
    /// List catalog models.
    Models {
        search: Option<String>,
        #[arg(long, short, default_value = "size_desc")]
        sort: ModelSort,
    },
    /// List Azure GPU VM sizes in the order the selector scans them.
    Skus,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let models_path = cli.models.as_deref();
    let skus_path = cli.skus.as_deref();

    match cli.command {
        Some(Commands::Size { model, run }) => {
            cmd_size(&model, &run, models_path, skus_path)?;
        }
        Some(Commands::Estimate {
            params_b,
            layers,
            hidden,
            run,
        }) => {
            let shape = ModelShape {
                params_b,
                layers,
                hidden,
                ctx_len: None,
            };
            let skus = load_skus(skus_path)?;
            cmd_estimate(&shape, &run, &skus)?;
        }
        Some(Commands::Models { search, sort }) => {
            cmd_models(search.as_deref(), sort, models_path)?;
        }
        Some(Commands::Skus) => {
            cmd_skus(skus_path)?;
        }
        None => {
            let model = cli.model.as_deref().unwrap_or(DEFAULT_MODEL_ID);
            cmd_size(model, &cli.run, models_path, skus_path)?;
        }
    }
    Ok(())
}

// ── Catalogs ─────────────────────────────────────────────────────────

fn load_models(path: Option<&Path>) -> anyhow::Result<Vec<ModelInfo>> {
    Ok(match path {
        Some(p) => model::load_models(p)?,
        None => model::load_models_local()?,
    })
}

fn load_skus(path: Option<&Path>) -> anyhow::Result<Vec<GpuSku>> {
    Ok(match path {
        Some(p) => sku::load_skus(p)?,
        None => sku::load_skus_local()?,
    })
}

// ── Size ─────────────────────────────────────────────────────────────

fn cmd_size(
    query: &str,
    run: &RunArgs,
    models_path: Option<&Path>,
    skus_path: Option<&Path>,
) -> anyhow::Result<()> {
    let models = load_models(models_path)?;
    let skus = load_skus(skus_path)?;

    let m = match model::resolve_model(&models, query) {
        Ok(m) => m,
        Err(e) => {
            let hits = model::filter_models(&models, query);
            if !hits.is_empty() {
                eprintln!("{}", s_dim().apply_to("  did you mean:"));
                for h in hits.iter().take(8) {
                    eprintln!("    {}", s_accent().apply_to(&h.model_id));
                }
                eprintln!();
            }
            return Err(e.into());
        }
    };

    let ctx = m.clamp_ctx(run.ctx);
    tracing::debug!(model = %m.model_id, requested = run.ctx, ctx, "resolved model");
    let config = EstimateConfig {
        ctx,
        batch: run.batch,
        precision: run.precision,
        training: run.training,
    };
    let result = size(&m.shape(), &config, &skus);

    if run.json {
        let out = serde_json::json!({
            "model_id": m.model_id,
            "ctx": ctx,
            "batch": config.batch,
            "precision": config.precision,
            "training": config.training,
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        s_header().apply_to(m.short_name()),
        s_param().apply_to(ModelInfo::fmt_params(m.params_b)),
    );
    print_config_line(&config);
    if ctx < run.ctx {
        println!(
            "  {}",
            s_warn().apply_to(format!(
                "context clamped from {} to {} (model maximum)",
                context::fmt_ctx(run.ctx),
                context::fmt_ctx(ctx)
            ))
        );
    }
    print_result(&result, config.training);
    Ok(())
}

fn cmd_estimate(shape: &ModelShape, run: &RunArgs, skus: &[GpuSku]) -> anyhow::Result<()> {
    let config = EstimateConfig {
        ctx: run.ctx,
        batch: run.batch,
        precision: run.precision,
        training: run.training,
    };
    let result = size(shape, &config, skus);

    if run.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        s_header().apply_to("custom shape"),
        s_param().apply_to(format!(
            "{}  {} layers  hidden {}",
            ModelInfo::fmt_params(shape.params_b),
            shape.layers,
            shape.hidden
        )),
    );
    print_config_line(&config);
    print_result(&result, config.training);
    Ok(())
}

fn print_config_line(config: &EstimateConfig) {
    let dot = s_tree().apply_to("\u{00b7}");
    let mut parts = vec![
        config.precision.label().to_string(),
        format!("ctx {}", context::fmt_ctx(config.ctx)),
        format!("batch {}", config.batch),
    ];
    if config.training {
        parts.push("training".to_string());
    }
    println!(
        "  {}",
        s_dim().apply_to(parts.join(&format!("  {}  ", dot)))
    );
}

fn print_result(result: &SizingResult, training: bool) {
    let mem = &result.memory;

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Component").fg(Color::AnsiValue(243)),
        Cell::new("Memory").fg(Color::AnsiValue(243)),
    ]);
    table.add_row(vec![
        Cell::new("  Model weights").fg(Color::AnsiValue(252)),
        Cell::new(fmt_gb(mem.weights_gb)).fg(Color::AnsiValue(248)),
    ]);
    table.add_row(vec![
        Cell::new("  KV cache").fg(Color::AnsiValue(252)),
        Cell::new(fmt_gb(mem.kv_gb)).fg(Color::AnsiValue(248)),
    ]);
    if training {
        table.add_row(vec![
            Cell::new("  Optimizer state").fg(Color::AnsiValue(252)),
            Cell::new(fmt_gb(mem.optimizer_gb(training))).fg(Color::AnsiValue(248)),
        ]);
    }
    table.add_row(vec![
        Cell::new("  Total (+20%)").fg(Color::AnsiValue(252)),
        Cell::new(fmt_gb(mem.total_gb)).fg(Color::AnsiValue(109)),
    ]);
    let gpus = match &result.sku {
        Some(s) => format!(
            "{} / {} per VM ({:.0}%)",
            result.gpus,
            s.gpus_per_vm,
            result.vram_utilization() * 100.0
        ),
        None => "N/A".to_string(),
    };
    table.add_row(vec![
        Cell::new("  GPUs required").fg(Color::AnsiValue(252)),
        Cell::new(gpus).fg(Color::AnsiValue(248)),
    ]);
    println!();
    println!("{table}");

    println!();
    match (&result.sku, result.memory_per_gpu_gb()) {
        (Some(s), Some(per_gpu)) => {
            println!("  {}", s_ok().apply_to("recommended configuration"));
            println!(
                "  {}",
                s_header().apply_to(format!(
                    "{} ({} {} GB) - Memory per GPU: {:.2} GB",
                    s.sku, s.gpu_model, s.vram_gb, per_gpu
                ))
            );
            println!();
            println!("  {}", s_accent().apply_to(s.az_create_command("llm")));
            println!("  {}", s_hint().apply_to(&s.docs_url));
        }
        (Some(s), None) => {
            println!(
                "  {}",
                s_ok().apply_to(format!("{} ({} {} GB)", s.sku, s.gpu_model, s.vram_gb))
            );
        }
        (None, _) => {
            println!("  {}", s_err().apply_to("No suitable SKU found"));
            println!(
                "  {}",
                s_hint().apply_to("no single VM in the catalog has enough GPU memory")
            );
        }
    }
    println!();
}

// ── Models ───────────────────────────────────────────────────────────

fn cmd_models(search: Option<&str>, sort: ModelSort, models_path: Option<&Path>) -> anyhow::Result<()> {
    let mut models = load_models(models_path)?;
    model::sort_models(&mut models, sort);
    let hits = model::filter_models(&models, search.unwrap_or(""));

    if hits.is_empty() {
        eprintln!(
            "{}",
            s_err().apply_to(format!("error: no models match '{}'", search.unwrap_or("")))
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Model").fg(Color::AnsiValue(243)),
        Cell::new("Params").fg(Color::AnsiValue(243)),
        Cell::new("Layers").fg(Color::AnsiValue(243)),
        Cell::new("Hidden").fg(Color::AnsiValue(243)),
        Cell::new("Max ctx").fg(Color::AnsiValue(243)),
    ]);
    for m in &hits {
        let name = if m.is_moe() {
            format!("  {} (MoE)", m.model_id)
        } else {
            format!("  {}", m.model_id)
        };
        table.add_row(vec![
            Cell::new(name).fg(Color::AnsiValue(252)),
            Cell::new(ModelInfo::fmt_params(m.params_b)).fg(Color::AnsiValue(139)),
            Cell::new(m.layers).fg(Color::AnsiValue(248)),
            Cell::new(m.hidden).fg(Color::AnsiValue(248)),
            Cell::new(m.ctx_len.map(context::fmt_ctx).unwrap_or_else(|| "\u{2500}".into()))
                .fg(Color::AnsiValue(248)),
        ]);
    }

    println!();
    println!("{table}");
    println!("{}", sep(64));
    println!(
        "{}",
        s_hint().apply_to(format!(
            "  {} of {} models   default context: {}",
            hits.len(),
            models.len(),
            context::fmt_ctx(DEFAULT_CTX)
        ))
    );
    println!();
    Ok(())
}

// ── SKUs ─────────────────────────────────────────────────────────────

fn cmd_skus(skus_path: Option<&Path>) -> anyhow::Result<()> {
    let mut skus = load_skus(skus_path)?;
    // Same order the selector scans in.
    skus.sort_by(|a, b| a.vram_gb.total_cmp(&b.vram_gb));

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  SKU").fg(Color::AnsiValue(243)),
        Cell::new("GPU").fg(Color::AnsiValue(243)),
        Cell::new("VRAM/GPU").fg(Color::AnsiValue(243)),
        Cell::new("GPUs").fg(Color::AnsiValue(243)),
        Cell::new("VM total").fg(Color::AnsiValue(243)),
    ]);
    for s in &skus {
        table.add_row(vec![
            Cell::new(format!("  {}", s.sku)).fg(Color::AnsiValue(252)),
            Cell::new(&s.gpu_model).fg(Color::AnsiValue(109)),
            Cell::new(format!("{:.0} GB", s.vram_gb)).fg(Color::AnsiValue(248)),
            Cell::new(s.gpus_per_vm).fg(Color::AnsiValue(248)),
            Cell::new(format!("{:.0} GB", s.total_vram_gb())).fg(Color::AnsiValue(248)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
