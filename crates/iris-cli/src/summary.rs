use std::path::Path;

use console::Style;
use iris_core::config::RunConfig;
use iris_core::consts::KEY_LIST;
use iris_core::history::FrameHistoryEntry;
use iris_core::io::reference::AttrValue;
use iris_core::stats::{FrameStatsRecord, IngestOutcome};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    error: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            error: Style::new().dim(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn format_attr(value: Option<AttrValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

pub fn print_run_summary(config: &RunConfig, image: &Path, refresh: bool) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("IRIS"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Exposure"),
        s.path.apply_to(image.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Run dir"),
        s.path.apply_to(config.data_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Instrument"),
        s.value.apply_to(config.instrument)
    );
    if refresh {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Reference"),
            s.disabled.apply_to("forced refresh")
        );
    }
    println!();
}

pub fn print_outcome(outcome: &IngestOutcome) {
    let s = Styles::new();
    let mode = if outcome.refreshed {
        "new reference"
    } else {
        "measured"
    };
    println!(
        "  {:<14}{} ({}, frame {}, {} stars)",
        s.label.apply_to("Odometer"),
        s.value.apply_to(outcome.odometer),
        mode,
        outcome.frame_index,
        outcome.star_count
    );
    println!();
}

/// Statistics table in the canonical key order, one row per statistic
/// with its error beside it.
pub fn print_stats(record: &FrameStatsRecord) {
    let s = Styles::new();
    println!("  {}", s.header.apply_to("Statistics"));
    for key in KEY_LIST.iter().filter(|k| !k.ends_with("_err")) {
        let value = format_attr(record.get(key));
        let error = format_attr(record.get(&format!("{}_err", key)));
        println!(
            "    {:<16}{:>12}  {}",
            s.label.apply_to(key),
            s.value.apply_to(value),
            s.error.apply_to(if error.is_empty() {
                error
            } else {
                format!("\u{00b1} {}", error)
            })
        );
    }
    println!();
}

pub fn print_history(cube: &Path, entries: &[FrameHistoryEntry]) {
    let s = Styles::new();
    println!(
        "  {} {}",
        s.header.apply_to("History of"),
        s.path.apply_to(cube.display())
    );

    let columns = ["fwhm-arc-1", "fwhm-arc-2", "extinction", "background", "dx-pix-1", "dy-pix-1"];
    print!("    {:>5}  {:>10}", "Frame", "Odometer");
    for c in columns {
        print!("  {:>11}", c);
    }
    println!();
    println!("    {}", "-".repeat(19 + 13 * columns.len()));

    for entry in entries {
        let odometer = entry
            .odometer
            .map(|o| o.to_string())
            .unwrap_or_else(|| "?".into());
        print!("    {:>5}  {:>10}", entry.index, odometer);
        match &entry.stats {
            Some(stats) => {
                for c in columns {
                    print!("  {:>11}", format_attr(stats.get(c)));
                }
                println!();
            }
            None => println!("  {}", s.disabled.apply_to("no stats")),
        }
    }
    println!();
}
