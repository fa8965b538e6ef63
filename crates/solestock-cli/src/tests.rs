use std::path::PathBuf;

use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["solestock-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["solestock-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn seed_grades_defaults_to_configured_path() {
    let cli = Cli::try_parse_from(["solestock-cli", "db", "seed-grades"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::SeedGrades { path: None }
        })
    ));
}

#[test]
fn seed_grades_accepts_path_override() {
    let cli = Cli::try_parse_from([
        "solestock-cli",
        "db",
        "seed-grades",
        "--path",
        "grades.yaml",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::SeedGrades { path: Some(ref p) }
        }) if *p == PathBuf::from("grades.yaml")
    ));
}

#[test]
fn products_import_requires_file() {
    assert!(Cli::try_parse_from(["solestock-cli", "products", "import"]).is_err());
}

#[test]
fn products_import_dry_run() {
    let cli = Cli::try_parse_from([
        "solestock-cli",
        "products",
        "import",
        "--file",
        "rows.json",
        "--dry-run",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Import { dry_run: true, .. }
        })
    ));
}

#[test]
fn products_export_defaults_to_stdout() {
    let cli = Cli::try_parse_from(["solestock-cli", "products", "export"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Export { output: None }
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["solestock-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["solestock-cli", "collect"]).is_err());
}
