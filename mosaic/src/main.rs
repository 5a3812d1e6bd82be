use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use mosaic_core::{ChartStyle, LayoutConfig, Orientation, Rasterizer, compose};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(about = "Render a modal split survey sheet as a mosaic chart", long_about = None)]
#[command(version)]
struct Cli {
    /// Survey sheet (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv)
    input: PathBuf,

    /// Output file; the extension picks png, svg or json (the layout)
    output: PathBuf,

    #[arg(long)]
    orientation: Option<Orientation>,

    /// JSON chart config with spacing, modes and orientation
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra font file used as the sans-serif family
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputKind {
    Png,
    Svg,
    Json,
}

impl OutputKind {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("svg") => Ok(Self::Svg),
            Some("json") => Ok(Self::Json),
            _ => bail!("output must end in .png, .svg or .json: {}", path.display()),
        }
    }
}

fn load_config(cli: &Cli) -> Result<LayoutConfig> {
    let base = match &cli.config {
        Some(path) => {
            let txt = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            LayoutConfig::from_json_str(&txt)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => LayoutConfig::default(),
    };
    let config = match cli.orientation {
        Some(o) => base.with_orientation(o),
        None => base,
    };
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let kind = OutputKind::from_path(&cli.output)?;
    let config = load_config(cli)?;
    let bytes = fs::read(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
    let file_name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let composed = compose(&bytes, &file_name, &config, &ChartStyle::default())?;
    let out: Vec<u8> = match kind {
        OutputKind::Png => {
            let rasterizer = Rasterizer::new(cli.font.as_deref())?;
            rasterizer.render_png(&composed.chart)?
        }
        OutputKind::Svg => composed.chart.svg.into_bytes(),
        OutputKind::Json => serde_json::to_vec_pretty(&composed.layout)?,
    };
    fs::write(&cli.output, &out).with_context(|| format!("writing {}", cli.output.display()))?;
    info!(
        output = %cli.output.display(),
        categories = composed.layout.bands.len(),
        bytes = out.len(),
        "chart written"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    run(&cli)
}
