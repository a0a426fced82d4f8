//! Light archive inspection tool.
//!
//! Lists the lights in a `light.mul` / `lightidx.mul` pair or writes one
//! decoded light out as a PAM image.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lightmul::{LightTexture, LightsConfig, LightsLoader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "lightmul", about = "Inspect light.mul light archives", version)]
struct Cli {
    /// Client directory containing light.mul and lightidx.mul
    #[arg(long, env = "LIGHTMUL_BASE_PATH", default_value = ".")]
    base_path: PathBuf,

    /// JSON configuration file, overrides the base path
    #[arg(long, env = "LIGHTMUL_CONFIG")]
    config: Option<PathBuf>,

    /// Number of index slots to read
    #[arg(long, env = "LIGHTMUL_MAX_COUNT")]
    max_count: Option<usize>,

    /// Read the data file through a file handle instead of mapping it
    #[arg(long)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every present light with its offset and size
    List,
    /// Decode one light and write it as a PAM (RGB_ALPHA) image
    Dump {
        /// Light identifier
        id: u32,
        /// Output file
        output: PathBuf,
    },
}

impl Cli {
    fn lights_config(&self) -> Result<LightsConfig> {
        let mut config = match &self.config {
            Some(path) => LightsConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => LightsConfig::new(&self.base_path),
        };
        if let Some(max_count) = self.max_count {
            config = config.with_max_count(max_count);
        }
        if self.no_mmap {
            config = config.with_memory_mapping(false);
        }
        Ok(config)
    }
}

fn write_pam(path: &Path, texture: &LightTexture) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    write!(
        out,
        "P7\nWIDTH {}\nHEIGHT {}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n",
        texture.width(),
        texture.height()
    )?;
    for pixel in texture.pixels() {
        out.write_all(&pixel.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.lights_config()?;
    tracing::debug!("Configuration: {:?}", config);

    let loader = LightsLoader::new(config);
    loader.load().await.context("loading light archive")?;

    let Some(archive) = loader.archive() else {
        bail!("light archive was not published after loading");
    };

    match cli.command {
        Command::List => {
            let table = archive.table();
            println!("{:>5}  {:>10}  {:>5}  {:>6}", "id", "offset", "width", "height");
            for (id, record) in table.present() {
                println!(
                    "{:>5}  {:>#10x}  {:>5}  {:>6}",
                    id, record.offset, record.width, record.height
                );
            }
            println!(
                "{} of {} slots present (max count {})",
                table.present_count(),
                table.len(),
                archive.reader().max_count()
            );
        }
        Command::Dump { id, output } => {
            let Some(texture) = archive.get(id)? else {
                bail!("no light with id {id}");
            };
            write_pam(&output, &texture)?;
            println!(
                "Wrote light {} ({}x{}) to {}",
                id,
                texture.width(),
                texture.height(),
                output.display()
            );
        }
    }

    loader.reset();
    Ok(())
}
