pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod html;
pub mod map;
pub mod render;
pub mod server;
pub mod types;
pub mod viewport;
pub mod wkt;
pub mod zones;

use clap::{Parser, Subcommand};
use color::Color;
use render::RenderRequest;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use types::Attribute;
use zones::ZoneTable;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the map of one country to an HTML file
    Render {
        /// Country to map, defaults to the configured default country
        #[arg(long)]
        country: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Attribute::Population)]
        attribute: Attribute,
        /// Color for the lowest value (#rrggbb or a color name)
        #[arg(long)]
        low: Option<Color>,
        /// Color for the highest value
        #[arg(long)]
        high: Option<Color>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Render every country for every attribute
    RenderAll,
    /// List the available countries with zone totals
    Countries,
    /// Serve maps over HTTP
    Serve,
}

fn load_table(app_config: &config::AppConfig) -> anyhow::Result<ZoneTable> {
    let rows = data::load_rows(&app_config.input.zones)?;
    Ok(ZoneTable::load(rows, &app_config.input.columns))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let app_config = config::AppConfig::load_from_file(&cli.config)?;
    let table = load_table(&app_config)?;
    if table.is_empty() {
        warn!(path = ?app_config.input.zones, "no zones loaded");
    }

    match cli.command {
        Commands::Render {
            country,
            attribute,
            low,
            high,
            output,
        } => {
            let country = country.unwrap_or_else(|| app_config.render.default_country.clone());
            let request = RenderRequest::new(country, attribute).with_colors(low, high);
            match render::render_to_file(&app_config, &table, &request, output.as_deref())? {
                Some(path) => println!("Map written to {}", path.display()),
                None => println!("No data for this selection: {}", request.group),
            }
        }
        Commands::RenderAll => {
            let written = render::render_all(&app_config, &table)?;
            println!("Wrote {} maps to {}", written.len(), app_config.output.dir.display());
        }
        Commands::Countries => {
            println!("{} zones loaded, {} rows rejected", table.len(), table.rejected());
            for summary in table.summaries() {
                println!(
                    "{}\t{} zones\tpopulation {}\tarea {} km²",
                    summary.group,
                    summary.zones,
                    map::format_number(summary.total_population, 0),
                    map::format_number(summary.total_area, 0),
                );
            }
        }
        Commands::Serve => {
            server::start_server(app_config, table).await?;
        }
    }

    Ok(())
}
