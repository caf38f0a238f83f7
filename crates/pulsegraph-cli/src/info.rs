//! Offline commands: period calculus and the type registries.

use chrono::{NaiveDate, NaiveTime, Utc};
use pulsegraph_core::{
    comparison_period, current_quarter, EventType, FreshnessThresholds, SignalType, SourceType,
};

pub(crate) fn run_periods(date: Option<NaiveDate>) {
    let now = date.map_or_else(Utc::now, |d| d.and_time(NaiveTime::MIN).and_utc());
    let current = current_quarter(now);

    println!("{:<12}{}", "DATE", now.format("%Y-%m-%d"));
    println!("{:<12}{current} (starts {})", "CURRENT", current.start_date());
    for back in 1..=4 {
        let period = comparison_period(now, back);
        println!("{:<12}{period}", format!("-{back}"));
    }
}

pub(crate) fn run_registry() {
    println!("{:<20}{:<24}{:<14}DESCRIPTION", "EVENT TYPE", "DEFAULT WINDOW", "FREQUENCY");
    for event_type in EventType::ALL {
        let meta = event_type.metadata();
        println!(
            "{:<20}{:<24}{:<14}{}",
            event_type.as_str(),
            meta.default_window,
            meta.typical_frequency,
            meta.description
        );
    }

    println!();
    println!("{:<20}{:<12}{:<16}DESCRIPTION", "SIGNAL TYPE", "UNIT", "RANGE");
    for signal_type in SignalType::ALL {
        let meta = signal_type.metadata();
        let range = match (meta.min_value, meta.max_value) {
            (Some(min), Some(max)) => format!("{min}..{max}"),
            (Some(min), None) => format!("{min}.."),
            (None, Some(max)) => format!("..{max}"),
            (None, None) => "\u{2014}".to_string(),
        };
        println!(
            "{:<20}{:<12}{:<16}{}",
            signal_type.as_str(),
            meta.unit,
            range,
            meta.description
        );
    }

    println!();
    let thresholds = FreshnessThresholds::default();
    println!("{:<20}DEFAULT MAX AGE", "SOURCE TYPE");
    for source_type in SourceType::ALL {
        println!(
            "{:<20}{}d",
            source_type.as_str(),
            thresholds.for_type(*source_type).num_days()
        );
    }
}
