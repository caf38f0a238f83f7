use super::*;
use crate::pipeline::select_targets;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["pulsegraph", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn seed_path_is_optional() {
    let cli = Cli::try_parse_from(["pulsegraph", "seed"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Seed { path: None }));

    let cli = Cli::try_parse_from(["pulsegraph", "seed", "--path", "seed.yaml"]).unwrap();
    match cli.command {
        Commands::Seed { path: Some(path) } => assert_eq!(path, PathBuf::from("seed.yaml")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn periods_parses_date() {
    let cli = Cli::try_parse_from(["pulsegraph", "periods", "--date", "2026-03-31"]).unwrap();
    let expected = NaiveDate::from_ymd_opt(2026, 3, 31);
    assert!(matches!(cli.command, Commands::Periods { date } if date == expected));
}

#[test]
fn periods_rejects_bad_date() {
    assert!(Cli::try_parse_from(["pulsegraph", "periods", "--date", "31/03/2026"]).is_err());
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["pulsegraph"]).is_err());
}

#[test]
fn freshness_requires_company() {
    assert!(Cli::try_parse_from(["pulsegraph", "freshness"]).is_err());

    let cli = Cli::try_parse_from([
        "pulsegraph",
        "freshness",
        "--company",
        "NVIDIA",
        "--period-a",
        "Q3-2025",
    ])
    .unwrap();
    match cli.command {
        Commands::Freshness {
            company,
            period_a,
            period_b,
        } => {
            assert_eq!(company, "NVIDIA");
            assert_eq!(period_a, Some(Period::new(3, 2025).unwrap()));
            assert!(period_b.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn malformed_period_is_rejected_at_parse_time() {
    let result = Cli::try_parse_from([
        "pulsegraph",
        "delta",
        "--company",
        "NVIDIA",
        "--period-a",
        "Q5-2025",
    ]);
    assert!(result.is_err());
}

#[test]
fn refresh_defaults() {
    let cli = Cli::try_parse_from(["pulsegraph", "refresh", "--company", "NVIDIA"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Refresh {
            period: None,
            event_type: EventType::Earnings,
            deadline_secs: None,
            force: false,
            ..
        }
    ));
}

#[test]
fn refresh_collects_repeated_source_types() {
    let cli = Cli::try_parse_from([
        "pulsegraph",
        "refresh",
        "--company",
        "NVIDIA",
        "--source-type",
        "news",
        "--source-type",
        "forum",
        "--event-type",
        "product_launch",
        "--deadline-secs",
        "30",
        "--force",
    ])
    .unwrap();
    match cli.command {
        Commands::Refresh {
            source_types,
            event_type,
            deadline_secs,
            force,
            ..
        } => {
            assert_eq!(source_types, vec![SourceType::News, SourceType::Forum]);
            assert_eq!(event_type, EventType::ProductLaunch);
            assert_eq!(deadline_secs, Some(30));
            assert!(force);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn refresh_rejects_unknown_source_type() {
    let result = Cli::try_parse_from([
        "pulsegraph",
        "refresh",
        "--company",
        "NVIDIA",
        "--source-type",
        "podcast",
    ]);
    assert!(result.is_err());
}

#[test]
fn delta_defaults_to_sentiment() {
    let cli = Cli::try_parse_from(["pulsegraph", "delta", "--company", "NVIDIA"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Delta {
            signal_type: SignalType::Sentiment,
            window: None,
            ..
        }
    ));
}

#[test]
fn compare_flags() {
    let cli = Cli::try_parse_from([
        "pulsegraph",
        "compare",
        "--company",
        "NVIDIA",
        "--auto-refresh",
        "--json",
        "--signal-type",
        "volatility",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Compare {
            auto_refresh: true,
            json: true,
            signal_type: SignalType::Volatility,
            event_type: EventType::Earnings,
            ..
        }
    ));
}

#[test]
fn unforced_refresh_targets_only_stale_types() {
    let stale = [SourceType::News, SourceType::Blog];
    assert_eq!(select_targets(&[], &stale, false), stale.to_vec());
    assert_eq!(
        select_targets(&[SourceType::Blog, SourceType::Forum], &stale, false),
        vec![SourceType::Blog]
    );
    assert!(select_targets(&[SourceType::Forum], &stale, false).is_empty());
}

#[test]
fn forced_refresh_takes_request_as_is() {
    assert_eq!(
        select_targets(&[SourceType::Forum], &[], true),
        vec![SourceType::Forum]
    );
    assert!(select_targets(&[], &[SourceType::News], true).is_empty());
}
