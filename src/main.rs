//! garden-directory: browse the gardens directory from the command line

use clap::{Parser, Subcommand, ValueEnum};
use garden_directory::{logging, Config, Gardens, QueryParams, SortDirection};
use tracing::info;

#[derive(Parser)]
#[command(name = "garden-directory")]
#[command(about = "Browse the gardens directory of a network")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GARDENS_CONFIG", default_value = "gardens.toml")]
    config: String,

    /// Chain id (overrides config file)
    #[arg(long, env = "GARDENS_CHAIN_ID")]
    chain_id: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List gardens
    List {
        /// Name filter
        #[arg(short, long)]
        filter: Option<String>,

        /// Indexer field to order by
        #[arg(long, default_value = "createdAt")]
        order_by: String,

        #[arg(long, value_enum, default_value_t = Direction::Desc)]
        direction: Direction,
    },
    /// Show one garden
    Show {
        /// Garden address
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for SortDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => SortDirection::Asc,
            Direction::Desc => SortDirection::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("garden_directory=info");

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(chain_id) = cli.chain_id {
        config.network.default_chain_id = chain_id;
    }
    info!("Network: {}", config.default_network()?);

    let gardens = Gardens::from_config(&config)?;

    match cli.command {
        Command::List {
            filter,
            order_by,
            direction,
        } => {
            let filter = filter.unwrap_or_default();
            gardens.set_query(QueryParams::sorted_by(order_by, direction.into()));
            gardens.set_name_filter(filter.clone());
            let mut views = gardens.aggregator().subscribe();
            views.wait_for(|view| view.applied_filter == filter).await?;
            let view = gardens.aggregator().ready().await;
            let listed = &view.gardens;

            for garden in listed.iter() {
                println!(
                    "{}  {:<32}  {:>6} proposals  {:>6} supporters",
                    garden.address,
                    garden.display_name(),
                    garden.proposal_count,
                    garden.supporter_count
                );
            }
            println!("{} gardens", listed.len());
        }
        Command::Show { id } => match gardens.open(&id).await {
            Ok(garden) => println!("{}", serde_json::to_string_pretty(&*garden)?),
            Err(err) if err.is_not_found() => {
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
            Err(err) => return Err(err.into()),
        },
    }

    Ok(())
}
