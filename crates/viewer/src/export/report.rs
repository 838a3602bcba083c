use std::fmt::Write as _;

use chrono::NaiveDate;
use compute::{SummaryStats, hectares};
use store::FeatureStore;
use tracing::info;

use super::{ExportError, ExportFile, MIME_TEXT, stamped_file_name};

const SEPARATOR: &str = "========================================";

/// Plain-text summary of the loaded dataset.
pub fn render_report(stats: &SummaryStats, date: NaiveDate) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, stats, date);
    out
}

fn write_report(out: &mut String, stats: &SummaryStats, date: NaiveDate) -> std::fmt::Result {
    writeln!(out, "LANDSLIDE SUSCEPTIBILITY ANALYSIS REPORT")?;
    writeln!(out, "Bontoc-Sagada Landscape, Mountain Province")?;
    writeln!(out, "Generated: {}", date.format("%Y-%m-%d"))?;
    writeln!(out)?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out)?;
    writeln!(out, "SUMMARY STATISTICS:")?;
    writeln!(out, "- Total Analyzed Areas: {}", stats.total_count())?;
    writeln!(
        out,
        "- Total Area Coverage: {:.2} hectares",
        hectares(stats.total_area())
    )?;
    writeln!(out)?;
    writeln!(out, "RISK LEVEL DISTRIBUTION:")?;
    for category in stats.categories_present() {
        writeln!(
            out,
            "- {}: {} areas ({:.1}%)",
            category.label(),
            stats.category(category).count,
            stats.area_share(category)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "METHODOLOGY:")?;
    writeln!(
        out,
        "This analysis uses Recursive Feature Elimination and Bayesian Ensemble Meta-Learning "
    )?;
    writeln!(
        out,
        "with Spatial Uncertainty Propagation to assess landslide susceptibility."
    )?;
    writeln!(out)?;
    writeln!(out, "DISCLAIMER:")?;
    writeln!(
        out,
        "This map is for planning and awareness purposes only. Field verification "
    )?;
    writeln!(out, "is recommended for detailed site-specific assessments.")?;
    writeln!(out)?;
    writeln!(out, "Generated by BSU Landslide Susceptibility Mapping System")?;
    writeln!(out, "Contact: geoinformatics@bsu.edu.ph")
}

pub fn export_report(
    store: &FeatureStore,
    prefix: &str,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let dataset = store.dataset().ok_or(ExportError::NoDataLoaded)?;
    let stats = compute::summarize(dataset);
    let file_name = stamped_file_name(prefix, date, "txt");
    info!(%file_name, "report exported");
    Ok(ExportFile {
        file_name,
        mime: MIME_TEXT,
        bytes: render_report(&stats, date).into_bytes(),
    })
}
