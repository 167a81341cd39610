use super::*;

#[test]
fn parses_ingest_with_id() {
    let cli = Cli::try_parse_from(["influ-cli", "ingest", "42"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Ingest { id: 42 }));
}

#[test]
fn ingest_requires_numeric_id() {
    assert!(Cli::try_parse_from(["influ-cli", "ingest", "maria"]).is_err());
    assert!(Cli::try_parse_from(["influ-cli", "ingest"]).is_err());
}

#[test]
fn parses_ingest_all_defaults() {
    let cli = Cli::try_parse_from(["influ-cli", "ingest-all"]).unwrap();
    assert!(matches!(cli.command, Commands::IngestAll { dry_run: false }));
}

#[test]
fn parses_ingest_all_dry_run() {
    let cli = Cli::try_parse_from(["influ-cli", "ingest-all", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Commands::IngestAll { dry_run: true }));
}

#[test]
fn parses_rate() {
    let cli = Cli::try_parse_from(["influ-cli", "rate", "7"]).unwrap();
    assert!(matches!(cli.command, Commands::Rate { id: 7 }));
}

#[test]
fn seed_path_is_optional() {
    let cli = Cli::try_parse_from(["influ-cli", "seed"]).unwrap();
    assert!(matches!(cli.command, Commands::Seed { path: None }));

    let cli = Cli::try_parse_from(["influ-cli", "seed", "--path", "other.yaml"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Seed { path: Some(ref p) } if p == &PathBuf::from("other.yaml")
    ));
}

#[test]
fn runs_limit_defaults_to_twenty() {
    let cli = Cli::try_parse_from(["influ-cli", "runs"]).unwrap();
    assert!(matches!(cli.command, Commands::Runs { limit: 20, id: None }));

    let cli = Cli::try_parse_from(["influ-cli", "runs", "--limit", "5"]).unwrap();
    assert!(matches!(cli.command, Commands::Runs { limit: 5, id: None }));
}

#[test]
fn runs_accepts_a_run_id() {
    let cli = Cli::try_parse_from(["influ-cli", "runs", "--id", "12"]).unwrap();
    assert!(matches!(cli.command, Commands::Runs { id: Some(12), .. }));

    assert!(Cli::try_parse_from(["influ-cli", "runs", "--id", "latest"]).is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["influ-cli"]).is_err());
}
