use regex::Regex;
use std::sync::LazyLock;
use time::Date;
use uuid::Uuid;

use crate::{
    amount::{Amount, parse_amount},
    errors::{ParseError, ValidationError},
    format::INDENT,
};

/// Tag appended to every entry this bot writes, exactly once per transaction.
pub(crate) const MARKER_TAG: &str = "#bot";

/// Trailing marker meaning "use the remembered category without asking".
const SKIP_CONFIRM_MARKER: char = '!';

/// Leading marker the transport layer prepends when echoing a failed message.
const RETRY_MARKER: char = '❌';

// explicit category given as trailing [Some:Account] token
static CATEGORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(.+)\]$").unwrap() // can't fail
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TxKind {
    /// Charged to a category account, auto-qualified with the category root.
    Expense,
    /// Between two fully qualified accounts, e.g. a cash withdrawal.
    Transfer,
}

/// One pending ledger entry. Created by parsing an incoming message, mutated
/// only by the account selector (category) and the commit pipeline (source
/// account default, category qualification), discarded after commit.
#[derive(Clone, Debug)]
pub(crate) struct Transaction {
    pub(crate) narration: String,
    pub(crate) category_account: Option<String>,
    pub(crate) source_account: String,
    pub(crate) amount: Amount,
    pub(crate) tags: Vec<String>,
    pub(crate) kind: TxKind,
    pub(crate) id: Uuid,
}

/// A parsed message with its control markers lifted out of the text.
#[derive(Clone, Debug)]
pub(crate) struct ParsedMessage {
    pub(crate) tx: Transaction,
    pub(crate) skip_confirm: bool,
    pub(crate) retried: bool,
}

impl Transaction {
    pub(crate) fn expense(
        narration: String,
        category_account: Option<String>,
        amount: Amount,
        tags: Vec<String>,
    ) -> Self {
        Transaction {
            narration,
            category_account,
            source_account: String::new(),
            amount,
            tags,
            kind: TxKind::Expense,
            id: Uuid::new_v4(),
        }
    }

    pub(crate) fn transfer(
        narration: &str,
        source_account: &str,
        target_account: &str,
        amount: Amount,
    ) -> Self {
        Transaction {
            narration: narration.to_string(),
            category_account: Some(target_account.to_string()),
            source_account: source_account.to_string(),
            amount,
            tags: Vec::default(),
            kind: TxKind::Transfer,
            id: Uuid::new_v4(),
        }
    }

    // check order is a visible contract: narration, category, source, zero, negative
    fn validate(&self) -> Result<(), ValidationError> {
        use ValidationError::*;

        if self.narration.is_empty() {
            return Err(EmptyNarration);
        }
        if self.category_account.as_deref().is_none_or(str::is_empty) {
            return Err(EmptyCategory);
        }
        if self.source_account.is_empty() {
            return Err(EmptySource);
        }
        if self.amount.is_zero() {
            return Err(ZeroAmount);
        }
        if self.amount.is_negative() {
            return Err(NegativeAmount);
        }
        Ok(())
    }

    /// Render the transaction as one ledger entry for the given day.
    ///
    /// Expense categories are qualified with the category root when needed,
    /// and the qualified name is written back so later balance lookups see
    /// it. The marker tag is appended on the first successful render only.
    pub(crate) fn render(
        &mut self,
        date: Date,
        currency: &str,
        category_root: &str,
    ) -> Result<String, ValidationError> {
        self.validate()?;

        if self.kind == TxKind::Expense {
            if let Some(category) = self.category_account.as_mut() {
                if !has_root(category, category_root) {
                    *category = format!("{category_root}:{category}");
                }
            }
        }

        if !self.tags.iter().any(|tag| tag == MARKER_TAG) {
            self.tags.push(MARKER_TAG.to_string());
        }

        let category = self.category_account.as_deref().unwrap_or_default();
        let mut entry = format!("\n{date} * \"{}\"", self.narration);
        for tag in &self.tags {
            entry.push(' ');
            entry.push_str(tag);
        }
        entry.push('\n');
        entry.push_str(&format!(
            "{INDENT}{} {} {currency}\n",
            self.source_account,
            self.amount.negated()
        ));
        entry.push_str(&format!("{INDENT}{category}\n"));

        Ok(entry)
    }
}

fn has_root(account: &str, root: &str) -> bool {
    account == root
        || account
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Strip control markers from a raw message. Idempotent: stripping an
/// already-stripped text changes nothing.
pub(crate) fn strip_markers(text: &str) -> (&str, bool, bool) {
    let mut text = text.trim();
    let mut skip_confirm = false;
    let mut retried = false;

    while let Some(rest) = text.strip_prefix(RETRY_MARKER) {
        retried = true;
        text = rest.trim_start();
    }
    while let Some(rest) = text.strip_suffix(SKIP_CONFIRM_MARKER) {
        skip_confirm = true;
        text = rest.trim_end();
    }
    while let Some(rest) = text.strip_prefix(SKIP_CONFIRM_MARKER) {
        skip_confirm = true;
        text = rest.trim_start();
    }

    (text, skip_confirm, retried)
}

/// Parse one line of free text into a pending transaction.
///
/// Format: `AMOUNT NARRATION... [#tag...] [\[Category:Path\]]`. Only the
/// contiguous trailing run of `#`-tokens counts as tags; the scan stops at
/// the first non-tag token from the right and everything before it belongs
/// to the narration, even if it looks like a tag. Narration memory keys on
/// the exact narration string, so this rule must not be loosened.
pub(crate) fn parse(text: &str) -> Result<ParsedMessage, ParseError> {
    let (text, skip_confirm, retried) = strip_markers(text);
    let mut parts = text.split(' ').collect::<Vec<_>>();

    // the split always yields at least one token, empty for an empty message
    let amount = parse_amount(parts[0])?;
    parts.remove(0);

    let category_account = match parts.last().and_then(|last| CATEGORY.captures(last)) {
        Some(captures) => {
            parts.pop();
            Some(captures[1].to_string())
        }
        None => None,
    };

    let mut tags = Vec::new();
    while parts.last().is_some_and(|last| last.starts_with('#')) {
        if let Some(tag) = parts.pop() {
            tags.push(tag.to_string());
        }
    }
    tags.reverse();

    let narration = parts.join(" ");
    tracing::debug!(
        "parsed message: amount {}, category {:?}, tags {:?}, narration '{}'",
        amount.minor_units(),
        category_account,
        tags,
        narration
    );

    Ok(ParsedMessage {
        tx: Transaction::expense(narration, category_account, amount, tags),
        skip_confirm,
        retried,
    })
}

/// The current local calendar day, falling back to UTC when the local
/// offset cannot be determined.
pub(crate) fn today() -> Date {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests;
