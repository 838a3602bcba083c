use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use layers::CategoryLayer;
use store::{DatasetOrigin, FeatureStore, LoadedDataset};
use tools::{DatasetSource, layer_table, summary_table, write_export};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewer::export::{self, ExportFile};
use viewer::{MapConfig, ViewMode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Landslide susceptibility dataset tool")]
struct Args {
    /// JSON config file (default: $RISKMAP_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset URL or path, overriding the configured one
    #[arg(long)]
    dataset: Option<String>,

    /// Fail instead of falling back to the bundled sample zones
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print zone counts and areas per risk category
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the plain-text analysis report
    Report {
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Date stamped into the report (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Write the loaded zones as GeoJSON
    ExportGeojson {
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Date stamped into the file name (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List the map layers the zones are split into
    Layers,
}

fn load_config(args: &Args) -> anyhow::Result<MapConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = MapConfig::load(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => MapConfig::from_env()?,
    };
    if let Some(dataset) = &args.dataset {
        config.dataset_path = dataset.clone();
    }
    Ok(config)
}

async fn load_store(config: &MapConfig, strict: bool) -> anyhow::Result<FeatureStore> {
    let source = DatasetSource::new();
    let location = config.dataset_path.as_str();
    let loaded = if strict {
        let dataset = store::try_load(&source, location)
            .await
            .with_context(|| format!("loading {location}"))?;
        LoadedDataset {
            dataset,
            origin: DatasetOrigin::Fetched {
                location: location.to_string(),
            },
        }
    } else {
        store::load(&source, location).await
    };
    if let DatasetOrigin::Fallback { reason } = &loaded.origin {
        warn!(%reason, "using bundled sample zones");
    }
    let mut store = FeatureStore::new();
    store.replace(loaded.dataset);
    Ok(store)
}

async fn save(out: &Path, file: ExportFile) -> anyhow::Result<()> {
    let path = write_export(out, &file)
        .await
        .with_context(|| format!("writing {}", file.file_name))?;
    info!(path = %path.display(), bytes = file.bytes.len(), "written");
    println!("{}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let store = load_store(&config, args.strict).await?;

    match args.command {
        Command::Summary { json } => {
            let stats = store.dataset().map(compute::summarize).unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", summary_table(&stats));
            }
        }
        Command::Report { out, date } => {
            let date = date.unwrap_or_else(export::export_date);
            let file = export::export_report(&store, &config.export.report_prefix, date)?;
            save(&out, file).await?;
        }
        Command::ExportGeojson { out, date } => {
            let date = date.unwrap_or_else(export::export_date);
            let file = export::export_data(&store, &config.export.data_prefix, date)?;
            save(&out, file).await?;
        }
        Command::Layers => {
            let layers = CategoryLayer::build_all(
                &store.partition_by_category(),
                &config.palette,
                |c| config.palette.default_visible(c),
                config.default_opacity,
                ViewMode::Planar.stroke_opacity(),
            );
            print!("{}", layer_table(&layers));
        }
    }

    Ok(())
}
