use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "\
Usage: tally-migrate [up [N] | down [N] | fresh | refresh | status]

Applies the ledger schema (accounts, payees, transactions).
The database is read from TALLY_DATABASE_URL, then DATABASE_URL,
and defaults to sqlite:./tally.db?mode=rwc.";

fn database_url() -> String {
    std::env::var("TALLY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite:./tally.db?mode=rwc".to_string())
}

/// Optional step count after `up`/`down`.
fn steps(arg: Option<String>) -> Result<Option<u32>, String> {
    arg.map(|raw| {
        raw.parse::<u32>()
            .map_err(|_| format!("invalid step count: {raw:?}"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = match steps(args.next()) {
        Ok(steps) => steps,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let db_url = database_url();
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        "down" => migration::Migrator::down(&db, steps.or(Some(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        "-h" | "--help" | "help" => println!("{USAGE}"),
        other => {
            eprintln!("unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
