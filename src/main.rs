use color_eyre::eyre::{Result, bail};
use std::{
    io::{BufRead, Write, stdin, stdout},
    time::Duration,
};
use tracing_subscriber::EnvFilter;

use crate::{
    amount::{format_amount, parse_amount},
    config::Config,
    ledger::Ledger,
    memory::NarrationMemory,
    selector::{Choice, Outcome, SelectionState, SelectorStore},
    transaction::Transaction,
};

use clap::{Parser, Subcommand};

/// How long an unanswered category selection stays alive.
const SELECTION_TTL: Duration = Duration::from_secs(15 * 60);

/// Conversation key for the single interactive session.
const CONVERSATION: &str = "cli";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// User whose narration memory to use
    #[clap(long, default_value = "cli")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the category accounts of the ledger
    Accounts,

    /// Parse a message and show the pending record
    Parse {
        /// Message text, e.g. "2.99 Coffee #trip"
        text: String,
    },

    /// Record an expense, asking for a category when needed
    Add {
        /// Message text, e.g. "2.99 Coffee #trip"
        text: String,
    },

    /// Record a cash withdrawal between two accounts
    Withdraw {
        /// Amount, e.g. "50" or "23.50"
        amount: String,

        /// Account the cash leaves
        #[arg(long)]
        from: String,

        /// Account the cash arrives in
        #[arg(long)]
        to: String,
    },

    /// Thorough load of the ledger, reporting errors only
    Validate,
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match &cli.command {
        Command::Accounts => {
            let ledger = Ledger::load(&config.main_path())?;
            for account in ledger.category_accounts() {
                println!("{account}");
            }
            Ok(())
        }

        Command::Parse { text } => {
            let parsed = transaction::parse(text)?;
            let tx = &parsed.tx;
            println!("amount:    {}", format_amount(tx.amount, &config.currency));
            println!("narration: {}", tx.narration);
            println!("category:  {}", tx.category_account.as_deref().unwrap_or("?"));
            if !tx.tags.is_empty() {
                println!("tags:      {}", tx.tags.join(" "));
            }
            if parsed.skip_confirm {
                println!("skip-confirm");
            }
            if parsed.retried {
                println!("retried");
            }
            Ok(())
        }

        Command::Add { text } => add(text, &cli.user, &config),

        Command::Withdraw { amount, from, to } => {
            let amount = parse_amount(amount)?;
            let mut tx = Transaction::transfer("Withdrawal", from, to, amount);
            let sync = config.synchronizer();
            let file = config.entry_file(transaction::today());
            let outcome = commit::commit(&mut tx, &file, &config, sync.as_ref())?;
            report(&tx, &outcome, &config);
            Ok(())
        }

        Command::Validate => {
            ledger::validate(&config.main_path())?;
            println!("ledger ok");
            Ok(())
        }
    }
}

fn add(text: &str, user: &str, config: &Config) -> Result<()> {
    let parsed = transaction::parse(text)?;
    let mut tx = parsed.tx;
    let ledger = Ledger::load(&config.main_path())?;
    let mut memory = NarrationMemory::load(&config.memory_path())?;

    if tx.category_account.is_none() {
        if let Some(remembered) = memory.recall(user, &tx.narration) {
            if parsed.skip_confirm || confirm(&format!("{remembered}?"))? {
                tx.category_account = Some(remembered.to_string());
            }
        }
    }

    let mut tx = if tx.category_account.is_none() {
        pick_category(tx, &ledger)?
    } else {
        tx
    };

    let sync = config.synchronizer();
    let file = config.entry_file(transaction::today());
    let outcome = commit::commit(&mut tx, &file, config, sync.as_ref())?;

    // a successful commit trains the memory for next time
    if let Some(category) = tx.category_account.as_deref() {
        memory.remember(user, &tx.narration, category);
        memory.save(&config.memory_path())?;
    }

    report(&tx, &outcome, config);
    Ok(())
}

fn report(tx: &Transaction, outcome: &commit::CommitOutcome, config: &Config) {
    println!("✅ {}", format_amount(tx.amount, &config.currency));
    println!("{}: {}", tx.source_account, outcome.source_balance);
    if let Some(category) = tx.category_account.as_deref() {
        println!("{category}: {}", outcome.category_balance);
    }
    if let Some(err) = &outcome.sync_error {
        eprintln!("⚠️ recorded locally, push failed: {err}");
    }
}

/// Walk the category hierarchy one segment at a time until a full category
/// account is chosen. `b` goes back, `q` cancels.
fn pick_category(tx: Transaction, ledger: &Ledger) -> Result<Transaction> {
    let mut store = SelectorStore::new(SELECTION_TTL);
    let id = tx.id.to_string();
    let state = SelectionState::start(id.clone(), tx, ledger);
    let mut buttons = state.buttons();
    store.save(CONVERSATION, state);

    let stdin = stdin();
    loop {
        for button in &buttons {
            println!("{} ({})", button.label, button.reference);
        }
        print!("> ");
        stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            store.cancel(CONVERSATION, &id);
            bail!("selection cancelled");
        };
        let line = line?;
        let choice = match line.trim() {
            "q" => {
                store.cancel(CONVERSATION, &id);
                bail!("selection cancelled");
            }
            "b" => Choice::Back,
            input => match input.parse::<usize>() {
                Ok(index) => Choice::Index(index),
                Err(_) => continue,
            },
        };

        match store.advance(CONVERSATION, &id, choice, ledger)? {
            Outcome::Resolved(tx) => return Ok(tx),
            Outcome::Pending(next) => buttons = next,
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    stdout().flush()?;

    let mut line = String::new();
    stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

pub(crate) mod amount;
pub(crate) mod commit;
pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod format;
pub(crate) mod ledger;
pub(crate) mod memory;
pub(crate) mod selector;
pub(crate) mod sync;
pub(crate) mod transaction;
