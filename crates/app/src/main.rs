use std::{error::Error, path::PathBuf, process::ExitCode};

use api_types::{
    balance::{BalancesResponse, GroupBalancesResponse},
    expense::{ExpenseListResponse, ExpenseNew},
    settlement::SettleRequest,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, EngineError, ExpenseFilter, Money};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use uuid::Uuid;

mod convert;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "splitledger")]
#[command(about = "Shared expenses: split, settle and net balances")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    /// Overrides the configured database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Expense(ExpenseArgs),
    /// Record a (partial) settlement for one participant.
    Settle(SettleArgs),
    /// Mark every participant of an expense as settled (creator only).
    SettleAll(SettleAllArgs),
    /// Balances with every counterparty, plus totals.
    Balances(BalanceArgs),
    /// Balances and spending per group.
    Groups(BalanceArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// Create an expense from a JSON request file.
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    Show {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        user: String,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        user: String,
    },
    List(BalanceArgs),
}

#[derive(Args, Debug)]
struct SettleArgs {
    #[arg(long)]
    expense: Uuid,
    /// User recording the settlement.
    #[arg(long)]
    user: String,
    /// Participant whose debt is settled.
    #[arg(long)]
    participant: String,
    /// Decimal amount, e.g. `12.50`. Settles the remainder when omitted.
    #[arg(long, value_parser = parse_money)]
    amount: Option<Money>,
    /// Fail if the expense changed since this version.
    #[arg(long)]
    expected_version: Option<i64>,
}

#[derive(Args, Debug)]
struct SettleAllArgs {
    #[arg(long)]
    expense: Uuid,
    #[arg(long)]
    user: String,
    #[arg(long)]
    expected_version: Option<i64>,
}

#[derive(Args, Debug)]
struct BalanceArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    group: Option<String>,
    /// Only expenses shared with this user.
    #[arg(long = "with")]
    counterparty: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`).
    #[arg(long, value_parser = parse_date)]
    from: Option<DateTime<Utc>>,
    /// Exclusive end date (`YYYY-MM-DD`).
    #[arg(long, value_parser = parse_date)]
    to: Option<DateTime<Utc>>,
}

impl BalanceArgs {
    fn filter(&self) -> ExpenseFilter {
        ExpenseFilter {
            from: self.from,
            to: self.to,
            counterparty: self.counterparty.clone(),
            group_id: self.group.clone(),
        }
    }
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| err.to_string())?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Process exit code for a failed command.
fn exit_code(err: &(dyn Error + 'static)) -> u8 {
    let Some(err) = err.downcast_ref::<EngineError>() else {
        return 1;
    };
    match err {
        err if err.is_validation() => 2,
        err if err.is_not_found() => 3,
        EngineError::Forbidden(_) => 4,
        EngineError::ExistingKey(_) | EngineError::Conflict(_) => 5,
        _ => 1,
    }
}

async fn connect_engine(database_url: &str) -> CliResult<Engine> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(Engine::builder().database(db).build().await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match settings::Settings::new() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid settings: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitledger={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(EngineError::Database(db_err)) = err.downcast_ref::<EngineError>() {
                tracing::error!("database error: {db_err}");
            }
            eprintln!("error: {err}");
            ExitCode::from(exit_code(&*err))
        }
    }
}

async fn run(cli: Cli, settings: settings::Settings) -> CliResult<()> {
    let database_url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%database_url, "connecting");
    let engine = connect_engine(&database_url).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            engine
                .create_user(&args.username, args.name.as_deref())
                .await?;
            println!("created user: {}", args.username);
        }
        Command::Expense(ExpenseArgs { command }) => match command {
            ExpenseCommand::Create { file } => {
                let raw = std::fs::read_to_string(&file)?;
                let req: ExpenseNew = serde_json::from_str(&raw)?;
                let expense = engine.create_expense(convert::expense_cmd(req)?).await?;
                print_json(&convert::expense_view(&expense))?;
            }
            ExpenseCommand::Show { id, user } => {
                let expense = engine.expense(id, &user).await?;
                print_json(&convert::expense_view(&expense))?;
            }
            ExpenseCommand::Delete { id, user } => {
                engine.delete_expense(id, &user).await?;
                println!("deleted expense: {id}");
            }
            ExpenseCommand::List(args) => {
                let expenses = engine.list_expenses(&args.user, &args.filter()).await?;
                print_json(&ExpenseListResponse {
                    expenses: expenses.iter().map(convert::expense_view).collect(),
                })?;
            }
        },
        Command::Settle(args) => {
            let req = SettleRequest {
                expense_id: args.expense,
                participant_id: args.participant,
                amount_minor: args.amount.map(Money::cents),
                expected_version: args.expected_version,
            };
            let expense = engine
                .settle_partial(convert::settle_cmd(req, &args.user))
                .await?;
            print_json(&convert::expense_view(&expense))?;
        }
        Command::SettleAll(args) => {
            let expense = engine
                .settle_full(args.expense, &args.user, args.expected_version)
                .await?;
            print_json(&convert::expense_view(&expense))?;
        }
        Command::Balances(args) => {
            let filter = args.filter();
            let friends = engine.friend_balances(&args.user, &filter).await?;
            let summary = engine.balance_summary(&args.user, &filter).await?;
            print_json(&BalancesResponse {
                friends: friends.iter().map(convert::friend_view).collect(),
                summary: convert::summary_view(&summary),
            })?;
        }
        Command::Groups(args) => {
            let groups = engine.group_balances(&args.user, &args.filter()).await?;
            print_json(&GroupBalancesResponse {
                groups: groups.iter().map(convert::group_view).collect(),
            })?;
        }
    }

    Ok(())
}
