//! Tirelire main entry point

mod app;
mod render;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args as ClapArgs, CommandFactory, FromArgMatches, Parser, Subcommand};
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tirelire_config::{Config, ConfigError};
use tirelire_core::{
    default_periods, export, filtered_total, log_error, suggest_entry, CategoryType, CoreError,
    SortDirection, SortKey, TransactionDraft, TransactionFilter, TransactionSort, YearMonth,
};
use tokio::runtime::Runtime;

use crate::app::App;

#[derive(Parser, Debug)]
#[command(name = "tirelire")]
#[command(author = "Tirelire Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Household budget tracker: planned versus actual, savings pots, balance carry-forward", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Month selector; months are numbered 1 to 12
#[derive(ClapArgs, Debug, Clone, Copy)]
struct MonthArg {
    #[arg(short, long)]
    year: Option<i32>,
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
}

impl MonthArg {
    fn resolve(&self) -> anyhow::Result<YearMonth> {
        let current = YearMonth::current();
        let year = self.year.unwrap_or(current.year);
        let month = self.month.map(|m| m - 1).unwrap_or(current.month());
        Ok(YearMonth::new(year, month)?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration and create the data directory
    Init {
        /// Add demonstration transactions and budgets to the current month
        #[arg(long)]
        sample: bool,
    },
    /// Monthly overview: balances, savings pots, budget consumption
    Dashboard(MonthArg),
    /// Actual versus planned per type and category for a month
    Stats(MonthArg),
    /// Record a transaction
    Add {
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: CategoryType,
        #[arg(short, long)]
        category: String,
        /// Amount; planned amount of the month when omitted
        #[arg(short, long, value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Option<Decimal>,
        /// Date as YYYY-MM-DD, today when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Change fields of a transaction
    Edit {
        id: u64,
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: Option<CategoryType>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Option<Decimal>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Delete a transaction
    Delete { id: u64 },
    /// List transactions, newest first
    List {
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: Option<CategoryType>,
        #[arg(short, long)]
        category: Option<String>,
        /// Text searched in category, comment and amount
        #[arg(short, long)]
        search: Option<String>,
        /// date, type, category or amount
        #[arg(long, default_value = "date")]
        sort: SortKey,
        #[arg(long)]
        asc: bool,
    },
    /// Planned amounts
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// Category lists
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Savings roll-up and opening balances
    #[command(subcommand)]
    Epargne(EpargneCommand),
    /// Compare two periods; current month against the previous one by default
    #[command(subcommand)]
    Compare(CompareCommand),
    /// Carry a month's checking balance into the first day of the next month
    ReportSolde(MonthArg),
    /// Export one year of transactions as semicolon-separated values
    ExportCsv {
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the whole household as JSON
    ExportJson {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the household from a JSON export
    ImportJson {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Synchronize with the remote now; --watch keeps following it
    Sync {
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    /// Set one month
    Set {
        #[arg(short, long)]
        year: i32,
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: CategoryType,
        #[arg(short, long)]
        category: String,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(short, long, value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Decimal,
    },
    /// Same amount for all twelve months
    Fill {
        #[arg(short, long)]
        year: i32,
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: CategoryType,
        #[arg(short, long)]
        category: String,
        #[arg(short, long, value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Decimal,
    },
    /// Copy one month of every category of a type to the other months
    Copy {
        #[arg(short, long)]
        year: i32,
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        category_type: CategoryType,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Create zero budgets for every category of a year
    Init {
        #[arg(short, long)]
        year: i32,
    },
    /// Annual planned and actual figures
    Overview {
        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    List,
    Add {
        #[arg(value_parser = parse_type)]
        category_type: CategoryType,
        name: String,
    },
    Rename {
        #[arg(value_parser = parse_type)]
        category_type: CategoryType,
        old: String,
        new: String,
    },
    /// Remove a category with its transactions and budgets
    Remove {
        #[arg(value_parser = parse_type)]
        category_type: CategoryType,
        name: String,
        #[arg(long)]
        yes: bool,
    },
    /// Restore the default lists
    Reset,
}

#[derive(Subcommand, Debug)]
enum EpargneCommand {
    /// Cumulative planned and actual savings per category
    Show {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Set the opening balance of a savings category
    SetBase {
        category: String,
        #[arg(value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Decimal,
    },
    ClearBase { category: String },
}

#[derive(Subcommand, Debug)]
enum CompareCommand {
    /// Current month against the previous one
    Default,
    Month {
        year1: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month1: u32,
        year2: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month2: u32,
    },
    Year { year1: i32, year2: i32 },
}

fn parse_type(s: &str) -> Result<CategoryType, String> {
    s.parse()
}

/// Accepts a decimal comma as well as a point
fn parse_amount(s: &str) -> Result<Decimal, String> {
    s.trim()
        .replace(',', ".")
        .parse::<Decimal>()
        .map_err(|e| format!("Invalid amount '{}': {}", s, e))
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [o/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes"))
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Écrit dans {}", path.display());
    Ok(())
}

fn init(config_path: &Path) -> anyhow::Result<Config> {
    if config_path.exists() {
        println!("Configuration déjà présente: {}", config_path.display());
    } else {
        std::fs::write(config_path, Config::generate_default())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Configuration créée: {}", config_path.display());
    }
    let config = Config::load(config_path)?;
    std::fs::create_dir_all(&config.data.path)?;
    Ok(config)
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    let app = App::open(config).await?;
    let json = args.json;

    match args.command {
        Command::Init { sample } => {
            if sample {
                let mut household = app.household.write().await;
                if !household.transactions().is_empty() {
                    bail!("Des transactions existent déjà, données de démonstration non ajoutées");
                }
                household.seed_sample(YearMonth::current())?;
                println!("Données de démonstration ajoutées");
            }
        }
        Command::Dashboard(month) => {
            let dashboard = app.household.read().await.dashboard(month.resolve()?);
            if json {
                render::print_json(&dashboard)?;
            } else {
                render::print_dashboard(&dashboard);
            }
        }
        Command::Stats(month) => {
            let stats = app
                .household
                .read()
                .await
                .aggregator()
                .calculate_stats(month.resolve()?);
            if json {
                render::print_json(&stats)?;
            } else {
                render::print_stats(&stats);
            }
        }
        Command::Add {
            category_type,
            category,
            amount,
            date,
            comment,
        } => {
            let mut household = app.household.write().await;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let suggestion = suggest_entry(
                household.budgets(),
                household.transactions(),
                date,
                category_type,
                &category,
            );
            let amount = amount
                .or(suggestion.amount)
                .context("Aucun montant donné ni prévu pour ce mois")?;
            let comment = comment.or(suggestion.comment).unwrap_or_default();
            let transaction = household.add_transaction(
                &TransactionDraft::new(date, category_type, category, amount).with_comment(comment),
            )?;
            render::print_transaction("Ajoutée", &transaction);
        }
        Command::Edit {
            id,
            category_type,
            category,
            amount,
            date,
            comment,
        } => {
            let mut household = app.household.write().await;
            let existing = household
                .transactions()
                .get(id)
                .cloned()
                .ok_or(CoreError::TransactionNotFound { id })?;
            let draft = TransactionDraft::new(
                date.unwrap_or(existing.date),
                category_type.unwrap_or(existing.category_type),
                category.unwrap_or(existing.category),
                amount.unwrap_or(existing.amount),
            )
            .with_comment(comment.unwrap_or(existing.comment));
            if household.update_transaction(id, &draft)? {
                if let Some(updated) = household.transactions().get(id) {
                    render::print_transaction("Modifiée", updated);
                }
            }
        }
        Command::Delete { id } => {
            if !app.household.write().await.delete_transaction(id) {
                return Err(CoreError::TransactionNotFound { id }.into());
            }
            println!("Transaction #{} supprimée", id);
        }
        Command::List {
            year,
            month,
            category_type,
            category,
            search,
            sort,
            asc,
        } => {
            let mut filter = TransactionFilter::new();
            if let Some(year) = year {
                filter = filter.year(year);
            }
            if let Some(month) = month {
                filter = filter.month(month - 1);
            }
            if let Some(category_type) = category_type {
                filter = filter.category_type(category_type);
            }
            if let Some(category) = category {
                filter = filter.category(category);
            }
            if let Some(search) = search {
                filter = filter.search(search);
            }
            let direction = if asc {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            };
            let household = app.household.read().await;
            let items = household
                .transactions()
                .list(&filter, TransactionSort::new(sort, direction));
            let total = filtered_total(&items);
            if json {
                render::print_json(&items)?;
            } else {
                render::print_transactions(&items, total);
            }
        }
        Command::Budget(command) => run_budget(&app, command, json).await?,
        Command::Category(command) => run_category(&app, command).await?,
        Command::Epargne(command) => run_epargne(&app, command, json).await?,
        Command::Compare(command) => {
            let household = app.household.read().await;
            let aggregator = household.aggregator();
            let comparison = match command {
                CompareCommand::Default => {
                    let (first, second) = default_periods(YearMonth::current());
                    aggregator.compare(first, second)
                }
                CompareCommand::Month {
                    year1,
                    month1,
                    year2,
                    month2,
                } => aggregator.compare_month(year1, month1 - 1, year2, month2 - 1)?,
                CompareCommand::Year { year1, year2 } => aggregator.compare_year(year1, year2),
            };
            if json {
                render::print_json(&comparison)?;
            } else {
                render::print_comparison(&comparison);
            }
        }
        Command::ReportSolde(month) => {
            let from = month.resolve()?;
            let mut household = app.household.write().await;
            let existing = household.pending_carry_forward(from)?;
            if existing.is_some()
                && !confirm(&format!(
                    "Un report existe déjà pour {}. Le remplacer ?",
                    from.next().long_label()
                ))?
            {
                println!("Annulé");
                return Ok(());
            }
            let result = household.report_solde(from)?;
            render::print_carry_forward(&result);
        }
        Command::ExportCsv { year, output } => {
            let year = year.unwrap_or(YearMonth::current().year);
            let csv = export::export_csv(&*app.household.read().await, year)?;
            let path = output.unwrap_or_else(|| PathBuf::from(export::csv_file_name(year)));
            write_output(&path, &csv)?;
        }
        Command::ExportJson { output } => {
            let now = Utc::now();
            let content = export::export_json(&*app.household.read().await, now)?;
            let path = output.unwrap_or_else(|| PathBuf::from(export::json_file_name(now)));
            write_output(&path, &content)?;
        }
        Command::ImportJson { file, yes } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if !yes && !confirm("L'import remplace toutes les données actuelles. Continuer ?")? {
                println!("Annulé");
                return Ok(());
            }
            let summary = export::import_json(&mut *app.household.write().await, &content)?;
            println!(
                "Importé: {} transaction(s), {} année(s) de budget",
                summary.transactions, summary.budget_years
            );
        }
        Command::Sync { watch } => {
            let Some(engine) = app.sync.clone() else {
                bail!("La synchronisation n'est pas activée (sync.enabled)");
            };
            let outcome = engine.reconcile().await?;
            println!("Synchronisation: {:?} ({})", outcome, engine.current_status());
            if watch {
                let watcher = app
                    .remote
                    .as_ref()
                    .map(|remote| remote.spawn_watcher(app.config.sync_debounce()));
                let listener = engine.listen();
                println!("En attente de modifications distantes (Ctrl-C pour quitter)");
                tokio::signal::ctrl_c().await?;
                listener.abort();
                if let Some(watcher) = watcher {
                    watcher.abort();
                }
            }
        }
    }

    app.persist().await?;
    app.finish().await;
    Ok(())
}

async fn run_budget(app: &App, command: BudgetCommand, json: bool) -> anyhow::Result<()> {
    match command {
        BudgetCommand::Set {
            year,
            category_type,
            category,
            month,
            amount,
        } => {
            app.household.write().await.set_budget_cell(
                year,
                category_type,
                &category,
                month - 1,
                amount,
            )?;
            println!("Budget {} {}/{} mis à jour", year, category_type.label(), category);
        }
        BudgetCommand::Fill {
            year,
            category_type,
            category,
            amount,
        } => {
            app.household
                .write()
                .await
                .fill_budget_year(year, category_type, &category, amount)?;
            println!("Budget {} {}/{} rempli", year, category_type.label(), category);
        }
        BudgetCommand::Copy {
            year,
            category_type,
            month,
        } => {
            let written = app
                .household
                .write()
                .await
                .copy_budget_month(year, category_type, month - 1)?;
            println!("{} cellule(s) copiée(s)", written);
        }
        BudgetCommand::Init { year } => {
            if app.household.write().await.ensure_budget_year(year) {
                println!("Budgets {} initialisés", year);
            } else {
                println!("Budgets {} déjà présents", year);
            }
        }
        BudgetCommand::Overview { year } => {
            let year = year.unwrap_or(YearMonth::current().year);
            let overview = app.household.read().await.budget_overview(year);
            if json {
                render::print_json(&overview)?;
            } else {
                render::print_budget_overview(&overview);
            }
        }
    }
    Ok(())
}

async fn run_category(app: &App, command: CategoryCommand) -> anyhow::Result<()> {
    let mut household = app.household.write().await;
    match command {
        CategoryCommand::List => {
            render::print_categories(household.registry(), household.transactions());
        }
        CategoryCommand::Add {
            category_type,
            name,
        } => {
            household.add_category(category_type, &name)?;
            render::print_type_names(category_type, household.registry().categories(category_type));
        }
        CategoryCommand::Rename {
            category_type,
            old,
            new,
        } => {
            let rename = household.rename_category(category_type, &old, &new)?;
            println!(
                "'{}' renommée en '{}' ({} transaction(s), {} année(s) de budget)",
                old, rename.name, rename.transactions, rename.budget_years
            );
        }
        CategoryCommand::Remove {
            category_type,
            name,
            yes,
        } => {
            let plan = household.plan_category_removal(category_type, &name)?;
            let question = format!(
                "Supprimer '{}' et ses {} transaction(s) ?",
                plan.name, plan.transactions
            );
            if !yes && !confirm(&question)? {
                println!("Annulé");
                return Ok(());
            }
            let outcome = household.commit_category_removal(&plan)?;
            println!(
                "'{}' supprimée ({} transaction(s), {} année(s) de budget)",
                plan.name, outcome.transactions, outcome.budget_years
            );
        }
        CategoryCommand::Reset => {
            household.reset_categories();
            println!("Catégories réinitialisées");
        }
    }
    Ok(())
}

async fn run_epargne(app: &App, command: EpargneCommand, json: bool) -> anyhow::Result<()> {
    match command {
        EpargneCommand::Show { year } => {
            let year = year.unwrap_or(YearMonth::current().year);
            let household = app.household.read().await;
            let aggregator = household.aggregator();
            let budget = aggregator.annual_epargne_budget(year);
            let reel = aggregator.annual_epargne_reel(year);
            if json {
                render::print_json(&serde_json::json!({
                    "year": year,
                    "budget": budget,
                    "reel": reel,
                }))?;
            } else {
                render::print_epargne(year, &budget, &reel);
            }
        }
        EpargneCommand::SetBase { category, amount } => {
            app.household
                .write()
                .await
                .set_epargne_base(&category, Some(amount))?;
            println!("Solde de départ de '{}' enregistré", category);
        }
        EpargneCommand::ClearBase { category } => {
            app.household
                .write()
                .await
                .set_epargne_base(&category, None)?;
            println!("Solde de départ de '{}' supprimé", category);
        }
    }
    Ok(())
}

fn report_error(error: &anyhow::Error, operation: &str) {
    if let Some(core) = error.downcast_ref::<CoreError>() {
        log_error(core, operation);
        eprintln!("{}", core.to_details());
    } else if let Some(config) = error.downcast_ref::<ConfigError>() {
        eprintln!("{}", config.to_details());
    } else {
        eprintln!("Error: {:#}", error);
    }
}

fn start(args: Args) -> anyhow::Result<()> {
    let config = match &args.command {
        Command::Init { .. } => init(&args.config)?,
        _ => Config::load_or_default(&args.config)?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level().to_string()),
    )
    .init();
    log::debug!("Data directory: {}", config.data.path.display());

    let rt = Runtime::new()?;
    rt.block_on(run(args, config))
}

fn main() {
    let matches = Args::command().get_matches();
    let operation = matches.subcommand_name().unwrap_or("tirelire").to_string();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    if let Err(e) = start(args) {
        report_error(&e, &operation);
        std::process::exit(1);
    }
}
