use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use smartspend_core::time::session_today;
use smartspend_core::{
    category_breakdown, display_remaining, month_summary, monthly_spend, total_spend, trend,
    DateRange, MAX_TREND_MONTHS,
};
use smartspend_intake::{
    AuthSession, IntakeOutcome, IntakePipeline, MemoryPersistence, Persistence, StateStore,
    StaticSession,
};

mod auth;
mod chat;
mod chat_worker;
mod config;
mod file_store;
mod llm;
mod session;
mod state;

use config::Config;
use file_store::JsonFileStore;
use session::LocalSession;

#[derive(Parser, Debug)]
#[command(
    name = "smartspend",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SMARTSPEND_BUILD_SHA"), ")"),
    about = "Log expenses by chatting and keep an eye on your monthly budgets"
)]
struct Cli {
    /// Keep everything in memory for this run; nothing is read or written
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in on this device
    Login {
        #[arg(long)]
        name: String,
    },

    /// Sign out on this device
    Logout,

    /// Show who is signed in
    Whoami,

    /// Store API keys for the expense parser
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage ~/.smartspend/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Chat: type what you spent, one expense per line
    Chat {
        /// Previous messages to replay on start
        #[arg(long, default_value_t = 10)]
        history: usize,
    },

    /// Log one expense, e.g. `smartspend add "uber 300 yesterday"`
    Add { text: String },

    /// List, set or remove monthly budgets
    Budget {
        #[command(subcommand)]
        command: BudgetCommand,
    },

    /// Spend per category over a date range (default: this month)
    Summary {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Monthly totals ending with the current month
    Trend {
        #[arg(long)]
        months: Option<usize>,
    },

    /// Most recent expenses
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Delete all expenses and chat, and restore default budgets
    Wipe {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    PasteOpenaiApiKey,
    PasteAnthropicToken,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    Show,
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    List,
    Set { category: String, limit: f64 },
    Rm { category: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_tracing(&cfg.log.level);

    match cli.command {
        Command::Login { name } => {
            let s = LocalSession::open(state::session_path()?)?.login(&name)?;
            println!("Signed in as {} ({})", s.display_name, s.user_id);
        }
        Command::Logout => {
            LocalSession::open(state::session_path()?)?.sign_out()?;
            println!("Signed out.");
        }
        Command::Whoami => {
            let s = LocalSession::open(state::session_path()?)?;
            match (s.display_name(), s.user_id()) {
                (Some(name), Some(id)) => println!("{name} ({id})"),
                _ => println!("Not signed in. Run: smartspend login --name <name>"),
            }
        }
        Command::Auth { command } => match command {
            AuthCommand::PasteOpenaiApiKey => auth::openai_paste_api_key()?,
            AuthCommand::PasteAnthropicToken => auth::anthropic_paste_token()?,
        },
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => print!("{}", toml::to_string_pretty(&cfg)?),
        },
        command => {
            let app = App::open(&cfg, cli.ephemeral).await?;
            app.run(command).await?;
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout belongs to the chat
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// A loaded session: the store plus what commands need around it.
struct App {
    store: Arc<StateStore>,
    cfg: Config,
    today: NaiveDate,
}

impl App {
    async fn open(cfg: &Config, ephemeral: bool) -> Result<Self> {
        let (persistence, auth): (Arc<dyn Persistence>, Arc<dyn AuthSession>) = if ephemeral {
            (
                Arc::new(MemoryPersistence::new()),
                Arc::new(StaticSession::signed_in("guest", "Guest")),
            )
        } else {
            (
                Arc::new(JsonFileStore::new(state::data_dir()?)),
                Arc::new(LocalSession::open(state::session_path()?)?),
            )
        };

        let store = Arc::new(StateStore::new(persistence, auth));
        store.load().await?;
        Ok(Self {
            store,
            cfg: cfg.clone(),
            today: session_today(cfg.session.timezone.as_deref())?,
        })
    }

    fn require_login(&self) -> Result<()> {
        if self.store.auth().user_id().is_none() {
            bail!("not signed in; run: smartspend login --name <name> (or pass --ephemeral)");
        }
        Ok(())
    }

    fn money(&self, amount: f64) -> String {
        // -0.0 would print as "-0.00"
        let amount = if amount == 0.0 { 0.0 } else { amount };
        format!("{}{:.2}", self.cfg.chat.currency, amount)
    }

    fn pipeline(&self) -> Result<IntakePipeline> {
        let parser = llm::parser_from_config(&self.cfg.llm, &auth::load_auth()?)?;
        let tz = self.cfg.session.timezone.clone();
        let fallback = self.today;
        Ok(IntakePipeline::new(self.store.clone(), parser)
            .with_currency(self.cfg.chat.currency.clone())
            .with_clock(move || session_today(tz.as_deref()).unwrap_or(fallback)))
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Chat { history } => {
                self.require_login()?;
                chat::run_chat(Arc::new(self.pipeline()?), history).await?;
            }
            Command::Add { text } => {
                self.require_login()?;
                let pipeline = self.pipeline()?;
                let outcome = pipeline.submit(&text).await;
                if outcome == IntakeOutcome::Ignored {
                    bail!("nothing to add");
                }
                let chat = self.store.chat();
                if let Some(reply) = chat.last() {
                    println!("{}", reply.text);
                }
                if outcome == IntakeOutcome::SaveFailed {
                    bail!("expense not saved");
                }
            }
            Command::Budget { command } => self.budget(command).await?,
            Command::Summary { from, to } => self.summary(DateRange::new(from, to)),
            Command::Trend { months } => {
                let months = months.unwrap_or(self.cfg.chat.trend_months);
                if months == 0 || months > MAX_TREND_MONTHS {
                    bail!("--months must be between 1 and {MAX_TREND_MONTHS}");
                }
                self.trend(months);
            }
            Command::History { limit } => self.history(limit),
            Command::Wipe { yes } => {
                if !yes {
                    bail!("this deletes every expense and chat message; re-run with --yes");
                }
                self.require_login()?;
                self.store.wipe().await;
                println!("All expenses and chat history deleted; budgets reset to defaults.");
            }
            Command::Login { .. }
            | Command::Logout
            | Command::Whoami
            | Command::Auth { .. }
            | Command::Config { .. } => {}
        }
        Ok(())
    }

    async fn budget(&self, command: BudgetCommand) -> Result<()> {
        match command {
            BudgetCommand::List => {
                let expenses = self.store.expenses();
                let (y, m) = (self.today.year(), self.today.month());
                println!("{:<16} {:>12} {:>12} {:>12}", "category", "limit", "spent", "left");
                for b in self.store.budgets().iter() {
                    let spent = monthly_spend(&expenses, &b.category, m, y);
                    println!(
                        "{:<16} {:>12} {:>12} {:>12}",
                        b.category,
                        self.money(b.limit),
                        self.money(spent),
                        self.money(display_remaining(b.limit, spent)),
                    );
                }
            }
            BudgetCommand::Set { category, limit } => {
                self.require_login()?;
                let b = self.store.upsert_budget(&category, limit).await?;
                println!("{} budget set to {}", b.category, self.money(b.limit));
            }
            BudgetCommand::Rm { category } => {
                self.require_login()?;
                if !self.store.delete_budget(&category).await {
                    bail!("no budget named {category:?}");
                }
                println!("Removed the {category} budget.");
            }
        }
        Ok(())
    }

    fn summary(&self, range: DateRange) {
        let expenses = self.store.expenses();
        let budgets = self.store.budgets();
        let rows = category_breakdown(&expenses, &budgets, &range, self.today);

        if let (Some(start), Some(end)) = range.bounds(self.today) {
            println!("{start} to {end}");
        }
        if rows.is_empty() {
            println!("No expenses in this period.");
        }
        for r in &rows {
            let cap = if r.limit > 0.0 {
                format!(" / {}", self.money(r.limit))
            } else {
                String::new()
            };
            println!("{:<16} {:>12}{cap}  {}", r.category, self.money(r.spent), r.color);
        }
        println!("Total: {}", self.money(total_spend(&expenses, &range, self.today)));

        let month = month_summary(&expenses, &budgets, self.today);
        println!(
            "This month: spent {} of {} budgeted ({} left)",
            self.money(month.spent),
            self.money(month.budgeted),
            self.money(month.remaining.max(0.0)),
        );
        if !month.over_budget.is_empty() {
            println!("Over budget: {}", month.over_budget.join(", "));
        }
    }

    fn trend(&self, months: usize) {
        let points = trend(&self.store.expenses(), months, self.today);
        let peak = points.iter().map(|p| p.total).fold(0.0_f64, f64::max);
        for p in points {
            let width = if peak > 0.0 {
                ((p.total / peak) * 30.0).round() as usize
            } else {
                0
            };
            println!(
                "{} {} {:<30} {}",
                p.label,
                p.year,
                "#".repeat(width),
                self.money(p.total)
            );
        }
    }

    fn history(&self, limit: usize) {
        let mut expenses = self.store.expenses();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        if expenses.is_empty() {
            println!("No expenses yet.");
        }
        for e in expenses.iter().take(limit) {
            println!(
                "{}  {:<14} {:>12}  {}",
                e.date,
                e.category,
                self.money(e.amount),
                e.description
            );
        }
    }
}
