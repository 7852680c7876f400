//! Cirrus Simulation Engine CLI
//!
//! Command-line interface for running serverless warehouse cost
//! simulations and exporting the results.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cirrus_simulation_engine::{
    config::{SimulationConfig, WarehouseSize},
    metrics::MetricsSummary,
    simulator::{run_simulation, SimulationReport},
};

#[derive(Parser, Debug)]
#[command(name = "cirrus-sim")]
#[command(about = "Simulate serverless warehouse autoscaling and cost", long_about = None)]
struct Args {
    /// JSON configuration file (defaults apply for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation duration in days
    #[arg(short, long)]
    days: Option<u32>,

    /// Random seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Warehouse size (2XSmall..4XLarge)
    #[arg(short, long)]
    warehouse_size: Option<WarehouseSize>,

    /// Number of scheduled dashboards
    #[arg(long)]
    dashboards: Option<u32>,

    /// Minimum concurrent interactive users per business hour
    #[arg(long)]
    min_users: Option<u32>,

    /// Maximum concurrent interactive users per business hour
    #[arg(long)]
    max_users: Option<u32>,

    /// Price per DBU ($)
    #[arg(long)]
    dbu_rate: Option<f64>,

    /// Write the metrics summary as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the per-step snapshot time series as CSV
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Write the per-query completion records as CSV
    #[arg(long)]
    queries: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Cirrus Simulation Engine                                ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  Duration: {} days ({}s steps)", config.days, config.time_step_seconds);
    println!(
        "  Warehouse: {} ({} DBUs/hour/cluster, {}-{} clusters)",
        config.warehouse.size,
        config.warehouse.dbus_per_hour(),
        config.warehouse.min_clusters,
        config.warehouse.max_clusters
    );
    println!("  Dashboards: {}", config.scheduled.num_dashboards);
    println!(
        "  Interactive users: {}-{} ({}h-{}h)",
        config.interactive.min_users,
        config.interactive.max_users,
        config.interactive.business_hours_start,
        config.interactive.business_hours_end
    );
    println!("  DBU rate: ${:.2}", config.pricing.dbu_rate);
    println!("  Seed: {}\n", config.seed);

    let report = run_simulation(config.clone())?;
    print_summary(&config, &report.summary);
    export(&args, &report)?;

    Ok(())
}

fn apply_overrides(config: &mut SimulationConfig, args: &Args) {
    if let Some(days) = args.days {
        config.days = days;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(size) = args.warehouse_size {
        config.warehouse.size = size;
    }
    if let Some(dashboards) = args.dashboards {
        config.scheduled.num_dashboards = dashboards;
    }
    if let Some(min_users) = args.min_users {
        config.interactive.min_users = min_users;
    }
    if let Some(max_users) = args.max_users {
        config.interactive.max_users = max_users;
    }
    if let Some(rate) = args.dbu_rate {
        config.pricing.dbu_rate = rate;
    }
}

fn print_summary(config: &SimulationConfig, summary: &MetricsSummary) {
    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Simulation Results                                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Queries:");
    println!(
        "  {:<28} {:>10}",
        "Total arrivals", summary.total_queries
    );
    println!("  {:<28} {:>10}", "Completed", summary.completed_queries);
    println!("  {:<28} {:>10}", "Scheduled", summary.scheduled_queries);
    println!("  {:<28} {:>10}", "Interactive", summary.interactive_queries);
    if summary.running_at_end > 0 {
        println!("  {:<28} {:>10}", "Running at horizon", summary.running_at_end);
    }
    if summary.unassigned_at_end > 0 {
        println!("  {:<28} {:>10}", "Unassigned at horizon", summary.unassigned_at_end);
    }

    println!("\nWait times (s):");
    println!(
        "  {:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "", "mean", "p50", "p95", "p99", "max"
    );
    for (label, stats) in [
        ("All", &summary.wait),
        ("Scheduled", &summary.scheduled_wait),
        ("Interactive", &summary.interactive_wait),
    ] {
        println!(
            "  {:<14} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            label, stats.mean, stats.p50, stats.p95, stats.p99, stats.max
        );
    }

    println!("\nWarehouse:");
    println!("  {:<28} {:>10.2}", "Avg clusters", summary.avg_clusters);
    println!("  {:<28} {:>10}", "Peak clusters", summary.peak_clusters);
    println!(
        "  {:<28} {:>9.1}%",
        "Avg utilization",
        summary.avg_utilization * 100.0
    );
    println!("  {:<28} {:>10}", "Max queue depth", summary.max_queue_depth);

    println!("\nCost ({} days simulated):", config.days);
    println!("  {:<28} {:>10.2}", "Total DBU-hours", summary.total_dbus);
    println!("  {:<28} {:>10.2}", "Total cost ($)", summary.total_cost);
    println!("  {:<28} {:>10.2}", "Daily ($)", summary.daily_cost);
    println!("  {:<28} {:>10.2}", "Monthly ($)", summary.monthly_cost);
    println!("  {:<28} {:>10.2}", "Annual ($)", summary.annual_cost);
    println!();
}

fn export(args: &Args, report: &SimulationReport) -> anyhow::Result<()> {
    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report.summary)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Metrics summary saved to {}", path.display());
    }

    if let Some(path) = &args.snapshots {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("writing {}", path.display()))?;
        for snapshot in &report.snapshots {
            writer.serialize(snapshot)?;
        }
        writer.flush()?;
        println!("Snapshot time series saved to {}", path.display());
    }

    if let Some(path) = &args.queries {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("writing {}", path.display()))?;
        for record in &report.completed {
            writer.serialize(record)?;
        }
        writer.flush()?;
        println!("Query records saved to {}", path.display());
    }

    Ok(())
}
