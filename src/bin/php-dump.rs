use anyhow::Context;
use clap::{Parser, ValueEnum};
use php_runtime::core::value::PhpValue;
use php_runtime::runtime::config::RuntimeConfig;
use php_runtime::runtime::context::{EngineBuilder, RequestContext};
use php_runtime::runtime::diagnostics::TracingErrorHandler;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    #[value(name = "print_r")]
    PrintR,
    #[value(name = "var_dump")]
    VarDump,
    #[value(name = "var_export")]
    VarExport,
    Json,
}

#[derive(Parser)]
#[command(name = "php-dump")]
#[command(about = "Load JSON as PHP values and dump them the way PHP would", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "print_r")]
    format: Format,

    /// Sort values, keeping keys (`asort`)
    #[arg(long)]
    sort: bool,

    /// Reverse the element order, keeping keys
    #[arg(long)]
    reverse: bool,

    /// Shuffle values (renumbers keys)
    #[arg(long)]
    shuffle: bool,

    /// Seed for --shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Runtime configuration as JSON (precision, serialize_precision, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON input; stdin when omitted
    #[arg(name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "php_runtime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            RuntimeConfig::from_json(&text)?
        }
        None => RuntimeConfig::default(),
    };
    if cli.seed.is_some() {
        config.random_seed = cli.seed;
    }

    let input = match &cli.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let json: serde_json::Value = serde_json::from_str(&input).context("Input is not valid JSON")?;

    let engine = EngineBuilder::new()
        .with_standard_extension()
        .build()
        .context("Failed to build engine")?;
    let mut ctx = RequestContext::with_config(engine, config);
    ctx.set_error_handler(TracingErrorHandler);

    let mut value = PhpValue::from_json(json);
    if value.is_array() {
        value = transform(&mut ctx, &cli, value)?;
    } else if cli.sort || cli.reverse || cli.shuffle {
        tracing::warn!("input is not an array; ignoring --sort/--reverse/--shuffle");
    }

    let rendered = match cli.format {
        Format::PrintR => ctx.call_function("print_r", &mut [value])?.to_php_string(),
        Format::VarDump => ctx.call_function("var_dump", &mut [value])?.to_php_string(),
        Format::VarExport => {
            let mut out = ctx.call_function("var_export", &mut [value])?.to_php_string();
            out.push_str("\n");
            out
        }
        Format::Json => {
            let mut text = serde_json::to_string_pretty(&value)?;
            text.push('\n');
            text.into()
        }
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Runs the requested array functions over `value`, in sort, reverse,
/// shuffle order.
fn transform(ctx: &mut RequestContext, cli: &Cli, value: PhpValue) -> anyhow::Result<PhpValue> {
    let mut slot = [value];
    if cli.sort {
        ctx.call_function("asort", &mut slot)?;
    }
    if cli.reverse {
        let reversed = ctx.call_function("array_reverse", &mut [slot[0].clone(), PhpValue::Bool(true)])?;
        slot[0] = reversed;
    }
    if cli.shuffle {
        ctx.call_function("shuffle", &mut slot)?;
    }
    let [value] = slot;
    Ok(value)
}
