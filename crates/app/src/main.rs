use std::{error::Error, time::Duration};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{AccountId, Amount, Engine, NewAccount, NewTransaction, Payee};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

mod settings;

type ResultApp<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Household ledger: accounts, payees and their transactions")]
struct Cli {
    /// Settings file name without extension (also read from `TALLY_CONFIG`).
    #[arg(long, env = "TALLY_CONFIG", default_value = "settings")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    Account(AccountCmd),
    Payee(PayeeCmd),
    Transactions(TransactionsCmd),
    Balances(BalancesCmd),
}

#[derive(Args, Debug)]
struct AccountCmd {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Add(NamedArgs),
    List,
}

#[derive(Args, Debug)]
struct PayeeCmd {
    #[command(subcommand)]
    command: PayeeCommand,
}

#[derive(Subcommand, Debug)]
enum PayeeCommand {
    Add(NamedArgs),
    List,
}

#[derive(Args, Debug)]
struct NamedArgs {
    #[arg(long)]
    name: String,
    /// Defaults to a fresh uuid.
    #[arg(long)]
    id: Option<String>,
}

#[derive(Args, Debug)]
struct TransactionsCmd {
    #[command(subcommand)]
    command: TransactionsCommand,
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    /// Record one transaction.
    Add(TransactionAddArgs),
    /// Create a batch from a JSON array of new transactions.
    Import { file: std::path::PathBuf },
    /// Active transactions of an account.
    List {
        #[arg(long)]
        account: String,
    },
}

#[derive(Args, Debug)]
struct TransactionAddArgs {
    #[arg(long)]
    account: String,
    /// External payee id.
    #[arg(long, required_unless_present = "transfer_to", conflicts_with = "transfer_to")]
    payee: Option<String>,
    /// Counter account of a transfer.
    #[arg(long)]
    transfer_to: Option<String>,
    /// Signed amount, e.g. `-12.50`.
    #[arg(long, allow_hyphen_values = true)]
    amount: Amount,
    /// Effective date (YYYY-MM-DD), today if omitted.
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    cleared: bool,
}

#[derive(Args, Debug)]
struct BalancesCmd {
    #[command(subcommand)]
    command: BalancesCommand,
}

#[derive(Subcommand, Debug)]
enum BalancesCommand {
    /// Rebuild every account balance from the active transactions.
    Recompute,
}

async fn connect_db(config: &settings::Database) -> ResultApp<DatabaseConnection> {
    let db = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

impl TransactionAddArgs {
    fn into_new_transaction(self) -> ResultApp<NewTransaction> {
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let tx = match (self.payee, self.transfer_to) {
            (Some(payee), None) => NewTransaction::external(date, self.account, payee, 0),
            (None, Some(counter)) => NewTransaction::transfer(date, self.account, counter, 0),
            _ => return Err("exactly one of --payee and --transfer-to is required".into()),
        };
        Ok(NewTransaction {
            amount: self.amount,
            ..tx.cleared(self.cleared)
        })
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ResultApp<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_accounts(accounts: &[engine::Account]) {
    for account in accounts {
        println!(
            "{}\t{}\tcleared {}\tpending {}",
            account.id, account.name, account.balance.cleared, account.balance.pending
        );
    }
}

#[tokio::main]
async fn main() -> ResultApp<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "tally={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_db(&settings.database).await?;
    let engine = Engine::builder().database(db).build().await?;
    let timeout = Duration::from_secs(settings.app.timeout_secs);

    match cli.command {
        Command::Migrate => {
            tracing::info!("database is up to date");
        }
        Command::Account(AccountCmd {
            command: AccountCommand::Add(args),
        }) => {
            let mut account = NewAccount::new(&args.name);
            if let Some(id) = args.id {
                account = account.id(id);
            }
            let created = engine.create_accounts(vec![account]).await?;
            for account in created {
                println!("created account: {} ({})", account.name, account.id);
            }
        }
        Command::Account(AccountCmd {
            command: AccountCommand::List,
        }) => {
            print_accounts(&engine.accounts().await?);
        }
        Command::Payee(PayeeCmd {
            command: PayeeCommand::Add(args),
        }) => {
            let mut payee = Payee::new(&args.name);
            if let Some(id) = args.id {
                payee = payee.id(id);
            }
            let created = engine.create_payees(vec![payee]).await?;
            for payee in created {
                println!("created payee: {} ({})", payee.name, payee.id);
            }
        }
        Command::Payee(PayeeCmd {
            command: PayeeCommand::List,
        }) => {
            for payee in engine.payees().await? {
                println!("{}\t{}", payee.id, payee.name);
            }
        }
        Command::Transactions(TransactionsCmd {
            command: TransactionsCommand::Add(args),
        }) => {
            let batch = vec![args.into_new_transaction()?];
            let created = engine
                .create_transactions_with_timeout(batch, timeout)
                .await?;
            print_json(&created)?;
        }
        Command::Transactions(TransactionsCmd {
            command: TransactionsCommand::Import { file },
        }) => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let batch: Vec<NewTransaction> = serde_json::from_str(&raw)?;
            tracing::info!("importing {} transactions from {}", batch.len(), file.display());
            let created = engine
                .create_transactions_with_timeout(batch, timeout)
                .await?;
            print_json(&created)?;
        }
        Command::Transactions(TransactionsCmd {
            command: TransactionsCommand::List { account },
        }) => {
            let transactions = engine
                .active_transactions(&AccountId::from(account))
                .await?;
            print_json(&transactions)?;
        }
        Command::Balances(BalancesCmd {
            command: BalancesCommand::Recompute,
        }) => {
            print_accounts(&engine.recompute_balances().await?);
        }
    }

    Ok(())
}
