use std::path::PathBuf;

use clap::{Parser, Subcommand};
use foundation::{parse_date, parse_layer_ids};
use tools::{
    ToolConfig, closest, day_window, forms, load_dates, load_registry, reconcile, selectable,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Date resolution for PRISM map layers")]
struct Args {
    /// Layer registry JSON (default: $PRISM_REGISTRY or ./layers.json)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Available dates JSON (default: $PRISM_DATES or ./dates.json)
    #[arg(long)]
    dates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dates shared by all date-bearing layers
    Selectable {
        /// Comma-separated layer ids
        #[arg(long)]
        layers: String,
    },

    /// Print the candidate closest to a date
    Closest {
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Comma-separated candidate dates
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<String>,
    },

    /// Reconcile an address-bar query and print the corrected state
    Reconcile {
        /// Query string, e.g. "hazardLayerIds=flood,storm&date=2024-01-05"
        #[arg(long)]
        query: String,

        /// Date to fall back to when no layer offers one (default: today)
        #[arg(long)]
        today: Option<String>,
    },

    /// Convert Kobo form responses into point features
    Forms {
        /// JSON array of raw responses
        #[arg(long)]
        responses: PathBuf,

        /// JSON form-field mapping
        #[arg(long)]
        fields: PathBuf,

        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        begin: String,

        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ToolConfig::resolve(args.registry, args.dates);

    let output = match args.command {
        Command::Selectable { layers } => {
            let registry = load_registry(&config.registry_path)?;
            let table = load_dates(&config.dates_path)?;
            let report = selectable(&registry, &table, &parse_layer_ids(&layers));
            serde_json::to_string_pretty(&report)?
        }
        Command::Closest { date, candidates } => closest(&date, &candidates)?,
        Command::Reconcile { query, today } => {
            let registry = load_registry(&config.registry_path)?;
            let table = load_dates(&config.dates_path)?;
            let today = today.as_deref().map(parse_date).transpose()?;
            let report = reconcile(registry, table, &query, today);
            serde_json::to_string_pretty(&report)?
        }
        Command::Forms {
            responses,
            fields,
            begin,
            end,
        } => {
            let (begin, end) = day_window(&begin, &end)?;
            let report = forms(&responses, &fields, begin, end)?;
            serde_json::to_string_pretty(&report)?
        }
    };
    println!("{output}");
    Ok(())
}
