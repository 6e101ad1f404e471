//! Charts and console tables for a pipeline snapshot, drawn with Plotters

use crate::aggregate::{AgeBin, Summaries};
use crate::model::ClusterOutcome;
use crate::pipeline::Snapshot;
use plotters::prelude::*;
use std::ops::Range;

/// Color palette for different clusters
static CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, MAGENTA, CYAN];

fn cluster_color(cluster: usize) -> &'static RGBColor {
    CLUSTER_COLORS.get(cluster).unwrap_or(&BLACK)
}

/// Value range covering `values` with 5% padding on each side
fn padded_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let pad = ((max - min) * 0.05).max(1.0);
    Some((min - pad)..(max + pad))
}

/// Scatter plot of service value against age, coloured by cluster
pub fn create_cluster_visualization(
    outcome: &ClusterOutcome,
    output_path: &str,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    let title = plot_title.unwrap_or("Patient Segments: Service Value vs Age");

    let x_range = padded_range(outcome.labelled.iter().map(|l| l.record.service_value))
        .ok_or_else(|| anyhow::anyhow!("No records to plot"))?;
    let y_range = padded_range(outcome.labelled.iter().map(|l| f64::from(l.record.age)))
        .ok_or_else(|| anyhow::anyhow!("No records to plot"))?;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Service Value (EUR)")
        .y_desc("Age")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(outcome.labelled.iter().map(|l| {
        Circle::new(
            (l.record.service_value, f64::from(l.record.age)),
            4,
            cluster_color(l.cluster).filled(),
        )
    }))?;

    for (cluster_id, centroid) in outcome.model.centroids.outer_iter().enumerate() {
        let (value, age) = (centroid[0], centroid[1]);
        let color = cluster_color(cluster_id);

        chart
            .draw_series(std::iter::once(Cross::new((value, age), 8, color.stroke_width(3))))?
            .label(format!("Segment {}", cluster_id))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = output_path, "cluster scatter written");

    Ok(())
}

/// Bar chart of revenue per service
pub fn create_service_revenue_chart(summaries: &Summaries, output_path: &str) -> crate::Result<()> {
    let services: Vec<(&String, &f64)> = summaries.revenue_per_service.iter().collect();
    if services.is_empty() {
        anyhow::bail!("No service revenue to plot");
    }
    let max_revenue = services.iter().map(|&(_, v)| *v).fold(0.0, f64::max);

    let root = BitMapBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Revenue per Service", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(services.len() as f64 - 0.5), 0f64..(max_revenue * 1.1))?;

    let label_for = |x: &f64| {
        let index = x.round();
        if (x - index).abs() > 1e-6 || index < 0.0 {
            return String::new();
        }
        services
            .get(index as usize)
            .map(|(name, _)| name.to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(services.len())
        .x_label_formatter(&label_for)
        .y_desc("Revenue (EUR)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(services.iter().enumerate().map(|(i, &(_, revenue))| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *revenue)], BLUE.filled())
    }))?;

    root.present()?;
    tracing::info!(path = output_path, "service revenue chart written");

    Ok(())
}

/// Histogram of patient ages
pub fn create_age_histogram_chart(histogram: &[AgeBin], output_path: &str) -> crate::Result<()> {
    let (Some(first), Some(last)) = (histogram.first(), histogram.last()) else {
        anyhow::bail!("No ages to plot");
    };
    let max_count = histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Age Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(first.lower..last.upper, 0f64..(max_count as f64 * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Age")
        .y_desc("Patients")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(histogram.iter().map(|bin| {
        Rectangle::new([(bin.lower, 0.0), (bin.upper, bin.count as f64)], GREEN.mix(0.7).filled())
    }))?;

    root.present()?;
    tracing::info!(path = output_path, "age histogram written");

    Ok(())
}

/// Print revenue, age and segment tables to stdout
pub fn print_summary_tables(snapshot: &Snapshot) {
    let summaries = &snapshot.summaries;

    println!("\n=== Summary ===");
    println!("Total revenue: EUR {:.2}", summaries.total_revenue);
    println!("Patients (visits): {}", summaries.patient_count);

    println!("\nRevenue per service:");
    for (service, revenue) in &summaries.revenue_per_service {
        println!("  {:<20} {:>10.2}", service, revenue);
    }

    println!("\nSpend per patient:");
    for (name, spend) in &summaries.spend_per_customer {
        println!("  {:<20} {:>10.2}", name, spend);
    }

    if let Some(stats) = summaries.age_stats {
        println!("\nAge distribution:");
        println!(
            "  min {} | q1 {:.1} | median {:.1} | q3 {:.1} | max {} | mean {:.1}",
            stats.min, stats.q1, stats.median, stats.q3, stats.max, stats.mean
        );
    }
}

/// Print per-segment sizes, means and fit quality to stdout
pub fn print_cluster_statistics(outcome: &ClusterOutcome) {
    let model = &outcome.model;
    let total = outcome.labelled.len();

    println!("\n=== Segment Statistics ===");
    println!("Number of segments: {}", model.n_clusters);
    println!("Within-cluster sum of squares: {:.2}", model.inertia);
    let silhouette = model.compute_silhouette_sample(&outcome.features, 100);
    println!("Silhouette score (sample): {:.3}", silhouette);

    println!("\n  Segment | Patients | Share  | Mean Value | Mean Age");
    println!("  --------|----------|--------|------------|---------");
    for summary in &outcome.summaries {
        let share = summary.size as f64 / total as f64 * 100.0;
        println!(
            "  {:7} | {:8} | {:5.1}% | {:10.2} | {:8.1}",
            summary.cluster, summary.size, share, summary.mean_service_value, summary.mean_age
        );
    }
}

/// Write every chart for a snapshot next to `base_output_path`
///
/// `report.png` yields `report.png` (segments), `report_services.png` and
/// `report_ages.png`. Charts with nothing to show are skipped.
pub fn generate_visualization_report(
    snapshot: &Snapshot,
    base_output_path: &str,
) -> crate::Result<Vec<String>> {
    let mut written = Vec::new();

    if let Ok(outcome) = &snapshot.clustering {
        create_cluster_visualization(outcome, base_output_path, None)?;
        written.push(base_output_path.to_string());
    }

    if !snapshot.summaries.revenue_per_service.is_empty() {
        let path = sibling_path(base_output_path, "services");
        create_service_revenue_chart(&snapshot.summaries, &path)?;
        written.push(path);
    }

    if !snapshot.summaries.age_histogram.is_empty() {
        let path = sibling_path(base_output_path, "ages");
        create_age_histogram_chart(&snapshot.summaries.age_histogram, &path)?;
        written.push(path);
    }

    Ok(written)
}

fn sibling_path(base: &str, suffix: &str) -> String {
    match base.strip_suffix(".png") {
        Some(stem) => format!("{}_{}.png", stem, suffix),
        None => format!("{}_{}.png", base, suffix),
    }
}
