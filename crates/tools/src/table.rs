//! Plain-text tables printed by the command line.

use std::fmt::Write;

use compute::{SummaryStats, hectares};
use layers::{CategoryLayer, Layer};

/// Per-category counts, areas and shares, most severe category first.
pub fn summary_table(stats: &SummaryStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}{:>7}{:>12}{:>8}{:>14}",
        "Category", "Zones", "Area (ha)", "Share", "Mean suscept."
    );
    for category in stats.categories_present().into_iter().rev() {
        let totals = stats.category(category);
        let mean = totals.mean_susceptibility().unwrap_or_default() * 100.0;
        let _ = writeln!(
            out,
            "{:<10}{:>7}{:>12.2}{:>7.1}%{:>13.1}%",
            category.label(),
            totals.count,
            hectares(totals.area),
            stats.area_share(category),
            mean
        );
    }
    let _ = writeln!(
        out,
        "{:<10}{:>7}{:>12.2}",
        "Total",
        stats.total_count(),
        hectares(stats.total_area())
    );
    out
}

/// The layers a surface would receive for the current dataset.
pub fn layer_table(layers: &[CategoryLayer]) -> String {
    let mut out = String::new();
    for layer in layers {
        let _ = writeln!(
            out,
            "{:<26}{:<20}{:<9}{:>5}  {}",
            layer.id(),
            layer.ids.source,
            layer.style.color,
            layer.features.len(),
            if layer.style.visible { "shown" } else { "hidden" }
        );
    }
    out
}
