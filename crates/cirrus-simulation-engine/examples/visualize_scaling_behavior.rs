//! Visualize warehouse autoscaling behavior
//!
//! Generates an interactive HTML chart showing:
//! - Cluster count reacting to load over time
//! - Queue depth during saturation
//! - Utilization against the scaling thresholds
//!
//! Usage:
//!   cargo run --example visualize_scaling_behavior
//!   Open visualizations/scaling_behavior.html in browser

use plotly::{
    color::NamedColor,
    common::{Line, Mode},
    layout::{Axis, Layout},
    Plot, Scatter,
};

use cirrus_simulation_engine::config::SimulationConfig;
use cirrus_simulation_engine::simulator::run_simulation;

fn main() {
    println!("Running 2-day simulation for visualization...");

    let mut config = SimulationConfig::default();
    config.days = 2;

    let report = run_simulation(config.clone()).expect("simulation run failed");
    println!("   {} snapshots recorded", report.snapshots.len());

    let hours: Vec<f64> = report
        .snapshots
        .iter()
        .map(|s| s.time / 3600.0)
        .collect();
    let clusters: Vec<f64> = report
        .snapshots
        .iter()
        .map(|s| s.clusters as f64)
        .collect();
    let queue_depth: Vec<f64> = report
        .snapshots
        .iter()
        .map(|s| s.queued_queries as f64)
        .collect();
    let utilization: Vec<f64> = report
        .snapshots
        .iter()
        .map(|s| s.utilization * 100.0)
        .collect();

    let cluster_trace = Scatter::new(hours.clone(), clusters)
        .name("Clusters")
        .mode(Mode::Lines)
        .line(Line::new().color(NamedColor::Blue).width(2.0));

    let queue_trace = Scatter::new(hours.clone(), queue_depth)
        .name("Queue depth")
        .mode(Mode::Lines)
        .line(Line::new().color(NamedColor::Red).width(1.5));

    let utilization_trace = Scatter::new(hours.clone(), utilization)
        .name("Utilization (%)")
        .mode(Mode::Lines)
        .y_axis("y2")
        .line(Line::new().color(NamedColor::OrangeRed).width(1.5));

    let scale_up_line = Scatter::new(
        vec![0.0, *hours.last().unwrap()],
        vec![
            config.warehouse.scale_up_threshold * 100.0,
            config.warehouse.scale_up_threshold * 100.0,
        ],
    )
    .name("Scale-up threshold")
    .mode(Mode::Lines)
    .y_axis("y2")
    .line(
        Line::new()
            .color(NamedColor::Gray)
            .width(1.0)
            .dash(plotly::common::DashType::Dash),
    );

    let mut plot = Plot::new();
    plot.add_trace(cluster_trace);
    plot.add_trace(queue_trace);
    plot.add_trace(utilization_trace);
    plot.add_trace(scale_up_line);

    let layout = Layout::new()
        .title("Warehouse Autoscaling Behavior (2 days)")
        .x_axis(
            Axis::new()
                .title("Time (hours)")
                .grid_color(NamedColor::LightGray),
        )
        .y_axis(
            Axis::new()
                .title("Clusters / queued queries")
                .grid_color(NamedColor::LightGray),
        )
        .y_axis2(
            Axis::new()
                .title("Utilization (%)")
                .overlaying("y")
                .side(plotly::common::AxisSide::Right)
                .range(vec![0.0, 120.0]),
        )
        .hover_mode(plotly::layout::HoverMode::X);

    plot.set_layout(layout);

    let output_path = "visualizations/scaling_behavior.html";
    std::fs::create_dir_all("visualizations").expect("create output directory");
    plot.write_html(output_path);

    println!("Visualization saved to {}", output_path);
    println!("\nSummary:");
    println!("   Peak clusters: {}", report.summary.peak_clusters);
    println!("   Max queue depth: {}", report.summary.max_queue_depth);
    println!(
        "   Avg utilization: {:.1}%",
        report.summary.avg_utilization * 100.0
    );
    println!("   Total cost: ${:.2}", report.summary.total_cost);
}
