use super::*;

const PRODUCT: &str = "6f1c2a4e-3b7d-4d2a-9c1e-0a5b8f7e6d31";
const USER: &str = "0d9e8f7a-6b5c-4d3e-8f2a-1b0c9d8e7f6a";

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["revagg", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["revagg", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["revagg"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_stats_run_with_ids() {
    let cli = Cli::try_parse_from(["revagg", "stats", "run", "--product", PRODUCT, "--user", USER])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Stats {
            command: StatsCommands::Run { product, user }
        }) if product.to_string() == PRODUCT && user.to_string() == USER
    ));
}

#[test]
fn stats_run_requires_user() {
    let result = Cli::try_parse_from(["revagg", "stats", "run", "--product", PRODUCT]);
    assert!(result.is_err());
}

#[test]
fn stats_run_rejects_malformed_uuid() {
    let result = Cli::try_parse_from([
        "revagg", "stats", "run", "--product", "not-a-uuid", "--user", USER,
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_stats_run_all() {
    let cli = Cli::try_parse_from(["revagg", "stats", "run-all"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Stats {
            command: StatsCommands::RunAll
        })
    ));
}

#[test]
fn parses_stats_show_with_period() {
    let cli = Cli::try_parse_from([
        "revagg", "stats", "show", "--product", PRODUCT, "--period", "last_week",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Stats {
            command: StatsCommands::Show {
                period: Some(revagg_core::TimePeriod::LastWeek),
                ..
            }
        })
    ));
}

#[test]
fn stats_show_rejects_unknown_period() {
    let result = Cli::try_parse_from([
        "revagg", "stats", "show", "--product", PRODUCT, "--period", "fortnight",
    ]);
    assert!(result.is_err());
}

#[test]
fn stats_runs_defaults_limit() {
    let cli = Cli::try_parse_from(["revagg", "stats", "runs"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Stats {
            command: StatsCommands::Runs {
                product: None,
                limit: 20
            }
        })
    ));
}
