use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::models::AggregatedStat;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTotal {
    pub signal_type: String,
    pub count: u64,
}

pub fn totals_by_type(stats: &[AggregatedStat]) -> Vec<TypeTotal> {
    let mut map: BTreeMap<&str, u64> = BTreeMap::new();
    for stat in stats {
        *map.entry(stat.signal_type.as_str()).or_insert(0) += stat.count;
    }

    map.into_iter()
        .map(|(signal_type, count)| TypeTotal {
            signal_type: signal_type.to_string(),
            count,
        })
        .collect()
}

/// Plain-text charts: totals per window, the per-type matrix, and type totals.
pub fn render_text_charts(stats: &[AggregatedStat]) -> String {
    let mut output = String::new();
    if stats.is_empty() {
        let _ = writeln!(output, "No data available for charts.");
        return output;
    }

    let windows: BTreeSet<NaiveDate> = stats.iter().map(|stat| stat.window).collect();
    let types: BTreeSet<&str> = stats.iter().map(|stat| stat.signal_type.as_str()).collect();
    let cells: BTreeMap<(NaiveDate, &str), u64> = stats
        .iter()
        .map(|stat| ((stat.window, stat.signal_type.as_str()), stat.count))
        .collect();

    let _ = writeln!(output, "Total signals by window");
    for window in &windows {
        let total: u64 = types
            .iter()
            .map(|signal_type| cells.get(&(*window, *signal_type)).copied().unwrap_or(0))
            .sum();
        let bar = "#".repeat(usize::try_from(total).unwrap_or(usize::MAX));
        let _ = writeln!(output, "{window} | {bar} ({total})");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Signals by type per window");
    for window in &windows {
        let row: Vec<String> = types
            .iter()
            .map(|signal_type| {
                let count = cells.get(&(*window, *signal_type)).copied().unwrap_or(0);
                format!("{signal_type}={count}")
            })
            .collect();
        let _ = writeln!(output, "{window} | {}", row.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Totals by signal type");
    for total in totals_by_type(stats) {
        let _ = writeln!(output, "{}: {}", total.signal_type, total.count);
    }

    output
}

pub fn write_text_charts(stats: &[AggregatedStat], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, render_text_charts(stats))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
