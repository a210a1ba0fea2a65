use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use svag_sprite::{SpriteConfig, compile, load_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "svag-sprite")]
#[command(about = "Compile a directory of SVG icons into a symbol sprite", long_about = None)]
struct Cli {
    /// Icon directory, or an existing sprite file
    source: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (use - for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Prefix for symbol ids
    #[arg(long)]
    symbol_prefix: Option<String>,

    /// Prefix for ids namespaced inside each icon
    #[arg(long)]
    style_prefix: Option<String>,

    /// Do not add the default optimization preset
    #[arg(long)]
    no_preset_default: bool,

    /// Repeat optimizations until the output is stable
    #[arg(long)]
    multipass: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print sprite size
    #[arg(short, long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("svag_sprite={}", log_level))),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SpriteConfig::default(),
    };

    // Flags win over the config file
    if let Some(source) = cli.source {
        config.compile.source = source;
    }
    if let Some(output) = cli.output {
        config.output = Some(output);
    }
    if let Some(prefix) = cli.symbol_prefix {
        config.compile.symbol_prefix = prefix;
    }
    if let Some(prefix) = cli.style_prefix {
        config.compile.style_prefix = prefix;
    }
    if cli.no_preset_default {
        config.compile.optimizer.preset_default = false;
    }
    if cli.multipass {
        config.compile.optimizer.multipass = true;
    }

    let sprite = compile(&config.compile)?;

    match config.output.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &sprite)?;
        }
        _ => io::stdout().write_all(sprite.as_bytes())?,
    }

    if cli.stats {
        let symbols = sprite.matches("<symbol").count();
        eprintln!("{} symbols, {} bytes", symbols, sprite.len());
    }

    Ok(())
}
