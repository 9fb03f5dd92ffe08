use clap::{Parser, Subcommand};
use mine_impact::{config, data, export, processing, server};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute impact once and write the output layers
    Analyze {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `analysis.radius_km`
        #[arg(short, long)]
        radius_km: Option<f64>,
        /// Overrides `output.dir`
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Serve the impact API for the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze {
            config,
            radius_km,
            output,
        } => {
            info!("Analyzing with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let options = app_config.analysis.impact_options()?;
            let radius_km = radius_km.unwrap_or(app_config.analysis.radius_km);

            // 1. Load
            let (mines, localities) = data::load_data(&app_config)?;

            // 2. Filter
            let (mines, localities) = app_config.filter.apply(&mines, &localities);
            info!(
                "Considering {} mines and {} localities at {} km",
                mines.len(),
                localities.len(),
                radius_km
            );

            // 3. Compute
            let result = processing::calculate_impact_with(&options, &mines, &localities, radius_km)?;
            if result.has_impact() {
                info!(
                    "Affected localities: {}, affected population: {}",
                    result.global_stats.total_affected_localities,
                    result.global_stats.total_affected_population
                );
            } else {
                info!("{}", server::NO_IMPACT_MESSAGE);
            }

            // 4. Write
            let out_dir = output.clone().unwrap_or_else(|| app_config.output.dir.clone());
            export::write_outputs(&out_dir, &result)?;

            info!("Analysis complete!");
        }
        Commands::Serve { config } => {
            info!("Serving with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let (mines, localities) = data::load_data(&app_config)?;

            server::start_server(app_config, mines, localities).await?;
        }
    }

    Ok(())
}
