//! Production Chain Calculator
//!
//! Resolves a registry of production buildings into supply chains and
//! reports what each chain needs and earns.

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record, warn};
use rusqlite::Connection;

use chain_calculator::report::{Market, Quote};
use chain_calculator::{LayoutConfig, calculator, db, extract, report, resolver, validate_registry};

#[derive(Parser)]
#[command(name = "chain-calculator")]
#[command(about = "Production chain resolver and profitability calculator")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "chain_data.db")]
    database: PathBuf,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import buildings from recognized screenshot text dumps
    Import {
        /// A text dump or a directory of them
        source: PathBuf,

        /// Clear existing buildings before import
        #[arg(long)]
        clear: bool,
    },

    /// Resolve the registry into production chains
    Resolve {
        /// Print the resource tree as JSON
        #[arg(long)]
        json: bool,

        /// Show every building of each chain
        #[arg(short = 'D', long)]
        detail: bool,

        /// Horizontal distance between diagram nodes
        #[arg(long, default_value = "150")]
        horizontal_spacing: f64,

        /// Vertical distance between diagram levels
        #[arg(long, default_value = "200")]
        vertical_spacing: f64,
    },

    /// Rank chains by profit in one market
    Report {
        /// Market to price in (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        market: Market,
    },

    /// Set the price of a resource in one market
    SetPrice {
        resource: String,

        /// primary or secondary
        market: Market,

        #[arg(long)]
        buy: f64,

        #[arg(long)]
        sell: f64,
    },

    /// List all buildings in the database
    ListBuildings,

    /// List all producible resources
    ListResources,

    /// Show details for a specific building
    Building {
        /// Building name
        name: String,
    },

    /// Remove a building from the registry
    Remove {
        /// Building name
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without screenshots)
    LoadSample,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow!("{}", e))?;
    log::set_max_level(level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { source, clear } => {
            if clear {
                println!("Clearing existing buildings...");
                db::clear_registry(&conn)?;
            }

            let stats = extract::extract_to_database(&conn, &source)?;
            println!("{}", stats);
        }

        Commands::Resolve {
            json,
            detail,
            horizontal_spacing,
            vertical_spacing,
        } => {
            if horizontal_spacing <= 0.0 || vertical_spacing <= 0.0 {
                bail!("Spacing must be positive");
            }
            let layout = LayoutConfig {
                horizontal_spacing,
                vertical_spacing,
            };

            let registry = load_checked_registry(&conn)?;
            let tree = resolver::resolve_with(&registry, &layout);

            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
                return Ok(());
            }

            if tree.chains.is_empty() && tree.isolated_buildings.is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
                return Ok(());
            }

            println!("{} production chain(s)\n", tree.total_chains);
            for chain in &tree.chains {
                if detail {
                    println!("{}", calculator::format_production_chain(chain));
                }
                println!("{}", calculator::summarize_chain(chain));
            }

            if !tree.isolated_buildings.is_empty() {
                println!("Isolated buildings:");
                for building in &tree.isolated_buildings {
                    println!("  {}", building.name);
                }
            }
        }

        Commands::Report { market } => {
            let registry = load_checked_registry(&conn)?;
            let tree = resolver::resolve(&registry);
            let prices = db::PriceStore::new(&conn);

            let rows = report::profit_report(&tree, &prices, market);
            if rows.is_empty() {
                println!("No production chains to report on.");
            } else {
                println!("Profit per cycle ({} market):", market);
                for row in rows {
                    println!("  {}", row);
                }
            }
        }

        Commands::SetPrice {
            resource,
            market,
            buy,
            sell,
        } => {
            if resource.trim().is_empty() {
                bail!("Resource name must not be empty");
            }
            db::set_price(&conn, &resource, market, Quote { buy, sell })?;
            println!("{} in {} market: buy {}, sell {}", resource.trim(), market, buy, sell);
        }

        Commands::ListBuildings => {
            let buildings = db::load_registry(&conn)?;
            if buildings.is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<30} {:>8} {:>8}", "Building", "Inputs", "Outputs");
                println!("{}", "-".repeat(48));
                for b in buildings {
                    println!("{:<30} {:>8} {:>8}", b.name, b.inputs.len(), b.outputs.len());
                }
            }
        }

        Commands::ListResources => {
            let resources = db::list_producible_resources(&conn)?;
            if resources.is_empty() {
                println!("No resources in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("Producible resources:");
                for r in resources {
                    println!("  {}", r);
                }
            }
        }

        Commands::Building { name } => {
            let buildings = db::load_registry(&conn)?;
            if let Some(b) = buildings.iter().find(|b| b.name == name) {
                println!("Building: {}", b.name);

                if !b.inputs.is_empty() {
                    println!("  Inputs:");
                    for i in &b.inputs {
                        println!("    {} x {}", i.resource_name, i.quantity);
                    }
                }

                if !b.outputs.is_empty() {
                    println!("  Outputs:");
                    for o in &b.outputs {
                        println!("    {} x {}", o.resource_name, o.quantity);
                    }
                }
            } else {
                println!("Building '{}' not found", name);
            }
        }

        Commands::Remove { name } => {
            if db::remove_building(&conn, &name)? {
                println!("Removed {}", name);
            } else {
                println!("Building '{}' not found", name);
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let count = load_sample_data(&conn)?;
            println!("Loaded {} sample buildings", count);
        }
    }

    Ok(())
}

/// Load the registry, warning about anything the resolver cannot rely on
fn load_checked_registry(conn: &Connection) -> Result<Vec<chain_calculator::Building>> {
    let registry = db::load_registry(conn)?;
    if let Err(errors) = validate_registry(&registry) {
        for error in errors {
            warn!("{}", error);
        }
    }
    Ok(registry)
}

/// Load a small sample economy for trying things out without screenshots
fn load_sample_data(conn: &Connection) -> Result<usize> {
    use chain_calculator::Building;

    db::clear_registry(conn)?;

    let buildings = [
        Building::new("Farm").with_output("Grain", 10.0),
        Building::new("Well").with_output("Water", 20.0),
        Building::new("Mill")
            .with_input("Grain", 5.0)
            .with_output("Flour", 4.0),
        Building::new("Bakery")
            .with_input("Flour", 6.0)
            .with_input("Water", 2.0)
            .with_output("Bread", 10.0),
        Building::new("Iron Mine").with_output("Iron Ore", 8.0),
        Building::new("Coal Mine").with_output("Coal", 6.0),
        Building::new("Smelter")
            .with_input("Iron Ore", 4.0)
            .with_input("Coal", 2.0)
            .with_output("Iron Ingot", 2.0),
        Building::new("Toolsmith")
            .with_input("Iron Ingot", 3.0)
            .with_input("Wood", 2.0)
            .with_output("Tools", 1.0),
        Building::new("Brewery")
            .with_input("Grain", 4.0)
            .with_input("Water", 4.0)
            .with_output("Beer", 6.0),
        Building::new("Sawmill")
            .with_input("Logs", 4.0)
            .with_output("Planks", 6.0),
    ];
    for building in &buildings {
        db::upsert_building(conn, building)?;
    }

    let prices = [
        ("Bread", 3.0, 2.5),
        ("Beer", 4.0, 3.5),
        ("Tools", 40.0, 35.0),
        ("Planks", 2.0, 1.5),
        ("Wood", 1.5, 1.0),
        ("Logs", 0.5, 0.3),
        ("Grain", 0.6, 0.4),
    ];
    for (resource, buy, sell) in prices {
        db::set_price(conn, resource, Market::Primary, Quote { buy, sell })?;
    }

    Ok(buildings.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_installs_once() {
        init_logging(2).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Debug);
        assert!(init_logging(0).is_err());
    }

    #[test]
    fn cli_parses_market_and_spacing() {
        let cli = Cli::parse_from(["chain-calculator", "report", "--market", "secondary"]);
        assert!(matches!(cli.command, Commands::Report { market: Market::Secondary }));

        let cli = Cli::parse_from(["chain-calculator", "-vv", "resolve", "--horizontal-spacing", "90"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Resolve { horizontal_spacing, vertical_spacing, .. } => {
                assert_eq!(horizontal_spacing, 90.0);
                assert_eq!(vertical_spacing, 200.0);
            }
            _ => panic!("expected resolve"),
        }
    }
}
