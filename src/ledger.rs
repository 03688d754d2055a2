use beancount_parser_lima::{
    self as parser, BeancountParser, BeancountSources, ParseError, ParseSuccess, Spanned,
};
use rust_decimal::Decimal;
use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    io::{self, Write},
    path::Path,
};

use crate::errors::LedgerError;

/// Residuals at or below this magnitude balance to zero.
const TOLERANCE_SCALE: u32 = 3;
const TOLERANCE_UNITS: i64 = 5;

/// An immutable snapshot of the configured ledger: declared accounts and
/// per-account per-currency inventories. Every operation that needs ledger
/// state takes a fresh snapshot, so there is no cache to invalidate.
#[derive(Clone, Debug)]
pub(crate) struct Ledger {
    accounts: Vec<String>,
    category_root: String,
    inventory: HashMap<String, hashbrown::HashMap<String, Decimal>>,
}

/// Adapter so engine error reports can be captured into a buffer, since the
/// engine writer must be `Write + Copy`.
#[derive(Clone, Copy)]
struct ErrorBuf<'a>(&'a RefCell<Vec<u8>>);

impl Write for ErrorBuf<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Ledger {
    pub(crate) fn load(path: &Path) -> Result<Self, LedgerError> {
        tracing::debug!("loading ledger from {:?}", path);
        let sources = BeancountSources::try_from(path)?;
        Self::from_sources(sources)
    }

    #[cfg(test)]
    pub(crate) fn load_str(content: &str) -> Result<Self, LedgerError> {
        Self::from_sources(BeancountSources::from(content))
    }

    fn from_sources(sources: BeancountSources) -> Result<Self, LedgerError> {
        let buf = RefCell::new(Vec::new());
        let error_buf = ErrorBuf(&buf);
        let parser = BeancountParser::new(&sources);

        let builder = match parser.parse() {
            Ok(ParseSuccess {
                directives,
                options,
                plugins: _,
                warnings,
            }) => {
                sources.write(error_buf, warnings)?;

                let mut builder = InventoryBuilder::new(
                    options
                        .account_type_name(parser::AccountType::Expenses)
                        .to_string(),
                );
                for directive in directives {
                    builder.directive(&directive);
                }
                builder
            }

            Err(ParseError { errors, warnings }) => {
                let count = errors.len();
                sources.write(error_buf, errors)?;
                sources.write(error_buf, warnings)?;

                return Err(LedgerError::Parse {
                    count,
                    report: String::from_utf8_lossy(&buf.borrow()).into_owned(),
                });
            }
        };

        let report = String::from_utf8_lossy(&buf.borrow()).into_owned();
        if !report.is_empty() {
            tracing::debug!("ledger warnings:\n{report}");
        }

        builder.build()
    }

    /// All declared accounts, sorted.
    pub(crate) fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub(crate) fn category_root(&self) -> &str {
        &self.category_root
    }

    /// Category accounts with the root prefix stripped, sorted.
    pub(crate) fn category_accounts(&self) -> Vec<String> {
        let prefix = format!("{}:", self.category_root);
        self.accounts
            .iter()
            .filter_map(|account| account.strip_prefix(&prefix))
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn qualify(&self, name: &str) -> String {
        format!("{}:{name}", self.category_root)
    }

    /// Accumulated balance of an account, formatted per currency in sorted
    /// currency order. `None` means the account is not declared; an open
    /// account with no postings reports zero.
    pub(crate) fn balance(&self, account: &str) -> Option<String> {
        let inventory = self.inventory.get(account)?;
        if inventory.is_empty() {
            return Some("0".to_string());
        }

        let mut currencies = inventory.keys().collect::<Vec<_>>();
        currencies.sort();
        Some(
            currencies
                .into_iter()
                .map(|cur| format!("{} {cur}", inventory[cur]))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Thorough load of the ledger root for its errors only.
pub(crate) fn validate(path: &Path) -> Result<(), LedgerError> {
    Ledger::load(path).map(|_| ())
}

#[derive(Debug)]
struct InventoryBuilder {
    category_root: String,
    open_accounts: BTreeSet<String>,
    // hashbrown for its stable Entry API, as elsewhere
    inventory: HashMap<String, hashbrown::HashMap<String, Decimal>>,
    errors: Vec<String>,
}

impl InventoryBuilder {
    fn new(category_root: String) -> Self {
        Self {
            category_root,
            open_accounts: BTreeSet::default(),
            inventory: HashMap::default(),
            errors: Vec::default(),
        }
    }

    fn build(self) -> Result<Ledger, LedgerError> {
        let Self {
            category_root,
            open_accounts,
            inventory,
            errors,
        } = self;

        if errors.is_empty() {
            Ok(Ledger {
                accounts: open_accounts.into_iter().collect(),
                category_root,
                inventory,
            })
        } else {
            Err(LedgerError::Invalid { errors })
        }
    }

    fn directive(&mut self, directive: &Spanned<parser::Directive>) {
        use parser::DirectiveVariant::*;

        match directive.variant() {
            Transaction(transaction) => self.transaction(transaction),
            Open(open) => self.open(open),
            Close(close) => self.close(close),
            _ => {}
        }
    }

    fn transaction(&mut self, transaction: &parser::Transaction) {
        use hashbrown::hash_map::Entry::*;

        // accumulate the residual over fully specified postings, keeping at
        // most one unspecified posting for interpolation
        let mut residual = hashbrown::HashMap::<String, Decimal>::default();
        let mut unspecified: Vec<String> = Vec::default();

        for posting in transaction.postings() {
            match (posting.amount(), posting.currency()) {
                (Some(amount), Some(currency)) => {
                    let amount = amount.item().value();
                    let currency = currency.item().to_string();

                    match residual.entry(currency.clone()) {
                        Occupied(mut entry) => {
                            let accumulated = entry.get() + amount;
                            if accumulated.is_zero() {
                                entry.remove_entry();
                            } else {
                                entry.insert(accumulated);
                            }
                        }
                        Vacant(entry) => {
                            entry.insert(amount);
                        }
                    }

                    self.post(&posting.account().item().to_string(), amount, currency);
                }
                _ => unspecified.push(posting.account().item().to_string()),
            }
        }

        if let Some(account) = unspecified.pop() {
            for (currency, number) in residual {
                self.post(&account, -number, currency);
            }
        } else {
            let tolerance = Decimal::new(TOLERANCE_UNITS, TOLERANCE_SCALE);
            let residual = residual
                .into_iter()
                .filter(|(_, number)| number.abs() > tolerance)
                .collect::<Vec<_>>();

            if !residual.is_empty() {
                self.errors.push(format!(
                    "unbalanced transaction, residual {}",
                    residual
                        .iter()
                        .map(|(cur, number)| format!("{} {cur}", -number))
                        .collect::<Vec<String>>()
                        .join(", ")
                ));
            }
        }

        // any further unspecified postings are errors
        for account in unspecified {
            self.errors.push(format!(
                "more than one posting without amount, posting to {account}"
            ));
        }
    }

    fn post(&mut self, account: &str, amount: Decimal, currency: String) {
        use hashbrown::hash_map::Entry::*;

        if !self.open_accounts.contains(account) {
            self.errors.push(format!("account {account} not open"));
            return;
        }

        // only non-zero positions are maintained
        let inventory = self.inventory.entry(account.to_string()).or_default();
        match inventory.entry(currency) {
            Occupied(mut position) => {
                let value = position.get_mut();
                *value += amount;
                if value.is_zero() {
                    position.remove_entry();
                }
            }
            Vacant(position) => {
                position.insert(amount);
            }
        }
    }

    fn open(&mut self, open: &parser::Open) {
        let account = open.account().item().to_string();
        if !self.open_accounts.insert(account.clone()) {
            self.errors
                .push(format!("account {account} already opened"));
        } else {
            self.inventory.entry(account).or_default();
        }
    }

    fn close(&mut self, close: &parser::Close) {
        let account = close.account().item().to_string();
        if !self.open_accounts.remove(&account) {
            self.errors.push(format!("account {account} not open"));
        }
    }
}
