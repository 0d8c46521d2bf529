//! Route network scenario tool.
//!
//! Usage:
//!   roadmesh classify --scenario demo.json --threshold 20
//!   roadmesh find-path --scenario demo.json --threshold 20 --from 1 --to 4 --save out.json
//!   roadmesh fetch-route --waypoints "27.70,85.30|27.72,85.33"

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use roadmesh_core::{
    encode_segment_records, export_path_details, merge_segments, pairwise_distances,
    segments_from_path, NetworkRules, SaveGranularity,
};
use roadmesh_routing::{RoutingClient, RoutingConfig};
use roadmesh_cli::{parse_endpoint, parse_waypoints, Scenario};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and search route networks from scenario files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every point as on or off the network
    Classify {
        #[command(flatten)]
        network: NetworkArgs,
    },
    /// Print the graph summary, or the full graph with --full
    Graph {
        #[command(flatten)]
        network: NetworkArgs,
        #[arg(long)]
        full: bool,
    },
    /// Shortest path between two points (numeric id) or nodes
    FindPath {
        #[command(flatten)]
        network: NetworkArgs,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Write the saved segment list, including this path, to a file
        #[arg(long)]
        save: Option<PathBuf>,
        #[arg(long, default_value = "path")]
        label: String,
        #[arg(long, value_enum, default_value_t = Granularity::MergedRuns)]
        granularity: Granularity,
    },
    /// Straight-line distances between every pair of points
    Distances {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Ask the routing service for a route through the waypoints
    FetchRoute {
        /// "lat,lon|lat,lon|..."; defaults to the scenario's points
        #[arg(long)]
        waypoints: Option<String>,
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Overrides ROUTING_API_KEY
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Args, Debug)]
struct NetworkArgs {
    #[arg(long)]
    scenario: PathBuf,
    /// Off-network threshold in meters
    #[arg(long)]
    threshold: f64,
    #[arg(long, default_value_t = 1000.0)]
    stitch_radius: f64,
    #[arg(long, default_value_t = 3)]
    max_neighbors: usize,
    /// Rank stitching candidates by distance only
    #[arg(long)]
    no_prefer_main_route: bool,
}

impl NetworkArgs {
    fn rules(&self) -> Result<NetworkRules> {
        let rules = NetworkRules::new(self.threshold)
            .with_stitch_radius(self.stitch_radius)
            .with_max_stitch_neighbors(self.max_neighbors)
            .with_prefer_main_route(!self.no_prefer_main_route);
        rules.validate()?;
        Ok(rules)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Granularity {
    PerEdge,
    MergedRuns,
}

impl From<Granularity> for SaveGranularity {
    fn from(value: Granularity) -> Self {
        match value {
            Granularity::PerEdge => SaveGranularity::PerEdge,
            Granularity::MergedRuns => SaveGranularity::MergedRuns,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Classify { network } => {
            let scenario = Scenario::load(&network.scenario)?;
            print_json(&scenario.classify(&network.rules()?))
        }
        Command::Graph { network, full } => {
            let scenario = Scenario::load(&network.scenario)?;
            let graph = scenario.graph(&network.rules()?);
            if full {
                print_json(&graph)
            } else {
                print_json(&graph.summary())
            }
        }
        Command::FindPath {
            network,
            from,
            to,
            save,
            label,
            granularity,
        } => {
            let scenario = Scenario::load(&network.scenario)?;
            let rules = network.rules()?;
            let (graph, result) =
                scenario.find_path(&rules, &parse_endpoint(&from), &parse_endpoint(&to))?;
            let Some(result) = result else {
                tracing::warn!("No path between {} and {}", from, to);
                return print_json(&serde_json::json!({ "found": false }));
            };

            if let Some(path) = save {
                let summary = segments_from_path(&result, &label, granularity.into());
                let mut segments = scenario.saved_segments.clone();
                let added = merge_segments(&mut segments, summary.segments);
                std::fs::write(&path, encode_segment_records(&segments)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(
                    "Saved {} new segments to {} ({:.1} m skipped)",
                    added,
                    path.display(),
                    summary.skipped_length_m
                );
            }
            print_json(&export_path_details(&graph, &result))
        }
        Command::Distances { scenario } => {
            let scenario = Scenario::load(&scenario)?;
            print_json(&pairwise_distances(&scenario.points))
        }
        Command::FetchRoute {
            waypoints,
            scenario,
            api_key,
        } => {
            let waypoints = match (waypoints, scenario) {
                (Some(waypoints), _) => parse_waypoints(&waypoints)?,
                (None, Some(path)) => Scenario::load(&path)?
                    .points
                    .iter()
                    .map(|point| point.position)
                    .collect(),
                (None, None) => bail!("Pass --waypoints or --scenario"),
            };
            let mut config = RoutingConfig::from_env();
            if let Some(key) = api_key {
                config.api_key = key;
            }
            let client = RoutingClient::new(config)?;
            let route = client.route(&waypoints).await?;
            print_json(&route)
        }
    }
}
