//! Scribe command line
//!
//! `scribe plan` runs one planning session over a JSON edge list,
//! `scribe simulate` drives seeded random sessions and checks the stream
//! stays acyclic, and `scribe schema` prints the resolved table layout.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use scribe_planner::{PlannerConfig, StreamType, TextUnit};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod plan;
mod simulate;

use simulate::{run_simulator, SimulatorConfig};

fn cli() -> Command {
    Command::new("scribe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plan edge mutations for edition sign streams")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Planner configuration (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("plan")
                .about("Plan one editing session against an edge list")
                .arg(
                    Arg::new("edges")
                        .long("edges")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of [item, next_item] pairs"),
                )
                .arg(
                    Arg::new("request")
                        .long("request")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON planning request"),
                )
                .arg(
                    Arg::new("apply")
                        .long("apply")
                        .action(ArgAction::SetTrue)
                        .help("Apply the plan and print the resulting readings"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run seeded random editing sessions")
                .arg(
                    Arg::new("ops")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of sessions to plan"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("40")
                        .value_parser(value_parser!(u32).range(2..))
                        .help("Size of the node id space"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("schema")
                .about("Print edge tables and hierarchy terminators")
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .value_parser(value_parser!(StreamType))
                        .help("Only this stream (sign-interpretation or text-fragment)"),
                ),
        )
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("warn".parse()?);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<PlannerConfig> {
    let config = match path {
        Some(path) => PlannerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PlannerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_schema(config: &PlannerConfig, only: Option<StreamType>) -> Result<()> {
    for stream in StreamType::ALL {
        if only.is_some_and(|s| s != stream) {
            continue;
        }
        let schema = config.schema_for(stream)?;
        println!("{stream} stream:");
        println!("  table:        {}", schema.table);
        println!("  item column:  {}", schema.item_column);
        println!("  next column:  {}", schema.next_item_column);
        println!("  owner table:  {} ({})", schema.owner_table, schema.owner_column);
    }

    if only.is_none() {
        println!("hierarchy:");
        for unit in TextUnit::ALL {
            let terminators = config
                .terminators
                .for_unit(unit)
                .map_or_else(String::new, |t| format!(" terminators {}/{}", t.start, t.end));
            let link = unit
                .child_link_table()
                .map_or_else(String::new, |t| format!(" children via {t}"));
            println!("  {unit}: {}{link}{terminators}", unit.table());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"))?;
    let config = load_config(matches.get_one::<PathBuf>("config"))?;

    match matches.subcommand() {
        Some(("plan", args)) => {
            let edges_path = args
                .get_one::<PathBuf>("edges")
                .context("--edges is required")?;
            let request_path = args
                .get_one::<PathBuf>("request")
                .context("--request is required")?;

            let edges = plan::read_edges(edges_path)?;
            let session = plan::read_session(request_path)?;
            let outcome = plan::run(&config, edges, &session, args.get_flag("apply")).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                plan::print_text(&outcome);
            }
        }
        Some(("simulate", args)) => {
            let sim = SimulatorConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                operations: args.get_one::<u64>("ops").copied().unwrap_or(1000),
                node_space: args.get_one::<u32>("nodes").copied().unwrap_or(40),
                stop_on_first_violation: args.get_flag("stop-on-violation"),
            };
            let report = run_simulator(&sim, &config).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(i32::from(!report.passed()));
        }
        Some(("schema", args)) => {
            print_schema(&config, args.get_one::<StreamType>("stream").copied())?;
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn plan_requires_inputs() {
        assert!(cli().try_get_matches_from(["scribe", "plan"]).is_err());
        let matches = cli()
            .try_get_matches_from(["scribe", "plan", "--edges", "e.json", "--request", "r.json", "--apply"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_flag("apply"));
    }

    #[test]
    fn schema_stream_parses() {
        let matches = cli()
            .try_get_matches_from(["scribe", "schema", "--stream", "text-fragment"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(
            args.get_one::<StreamType>("stream").copied(),
            Some(StreamType::TextFragmentStream)
        );
    }

    #[test]
    fn config_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.toml");
        std::fs::write(&path, "cycle_search_limit = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "max_enumerated_paths = 8\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().max_enumerated_paths, 8);
    }
}
