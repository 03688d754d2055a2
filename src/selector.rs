use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{errors::SelectorError, ledger::Ledger, transaction::Transaction};

const BACK_LABEL: &str = "⬅️ Back";

/// Reference payload of an inline button, round-tripped through the
/// transport layer verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Button {
    pub(crate) label: String,
    pub(crate) reference: String,
}

impl Button {
    fn new(label: impl Into<String>, reference: String) -> Self {
        Button {
            label: label.into(),
            reference,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Choice {
    Back,
    Index(usize),
}

/// Outcome of one selector step.
#[derive(Debug)]
pub(crate) enum Step {
    /// The path reached a full category account; the transaction carries it.
    Resolved,
    /// More segments to choose; present `buttons()` again.
    Pending,
}

/// One in-flight category selection, owned by the message that started it.
///
/// `path` is the list of segments chosen so far under the category root;
/// the empty path is the root of the hierarchy.
#[derive(Clone, Debug)]
pub(crate) struct SelectionState {
    pub(crate) id: String,
    pub(crate) options: Vec<String>,
    pub(crate) path: Vec<String>,
    pub(crate) tx: Transaction,
}

/// Immediate next segments of the category accounts under `path`,
/// deduplicated and sorted.
pub(crate) fn candidates_for_path(accounts: &[String], path: &[String]) -> Vec<String> {
    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{}:", path.join(":"))
    };

    let mut candidates = accounts
        .iter()
        .filter_map(|account| account.strip_prefix(&prefix))
        .map(|rest| match rest.split_once(':') {
            Some((first, _)) => first.to_string(),
            None => rest.to_string(),
        })
        .collect::<Vec<_>>();
    candidates.sort();
    candidates.dedup();
    candidates
}

impl SelectionState {
    pub(crate) fn start(id: String, tx: Transaction, ledger: &Ledger) -> Self {
        let options = ledger.category_accounts();
        let path = Vec::default();
        SelectionState {
            id,
            options,
            path,
            tx,
        }
    }

    pub(crate) fn candidates(&self) -> Vec<String> {
        candidates_for_path(&self.options, &self.path)
    }

    /// Apply one choice. Selecting a segment that completes a full category
    /// account resolves the selection and stores the qualified account on
    /// the transaction.
    ///
    /// The candidate list is recomputed from the given ledger snapshot, not
    /// from the one the selection started with, so accounts added while the
    /// question was pending show up.
    pub(crate) fn advance(
        &mut self,
        choice: Choice,
        ledger: &Ledger,
    ) -> Result<Step, SelectorError> {
        self.options = ledger.category_accounts();
        match choice {
            Choice::Back => {
                self.path.pop();
                Ok(Step::Pending)
            }
            Choice::Index(index) => {
                let candidates = self.candidates();
                let Some(segment) = candidates.get(index) else {
                    return Err(SelectorError::ChoiceOutOfRange {
                        index,
                        len: candidates.len(),
                    });
                };
                self.path.push(segment.clone());

                let chosen = self.path.join(":");
                if self.options.contains(&chosen) {
                    self.tx.category_account = Some(ledger.qualify(&chosen));
                    tracing::debug!("selection {} resolved to {}", self.id, &chosen);
                    Ok(Step::Resolved)
                } else {
                    Ok(Step::Pending)
                }
            }
        }
    }

    /// One button per candidate segment, preceded by a back button whenever
    /// there is a segment to go back from.
    pub(crate) fn buttons(&self) -> Vec<Button> {
        let mut buttons = Vec::default();
        if !self.path.is_empty() {
            buttons.push(Button::new(BACK_LABEL, format!("accounts:{}:back", self.id)));
        }
        for (i, candidate) in self.candidates().into_iter().enumerate() {
            buttons.push(Button::new(candidate, format!("accounts:{}:{i}", self.id)));
        }
        buttons
    }

    /// The yes/no pair for the remembered-category shortcut.
    pub(crate) fn confirm_buttons(&self) -> Vec<Button> {
        vec![
            Button::new("No", format!("accounts:{}:back", self.id)),
            Button::new("Yes", format!("confirm:{}", self.id)),
        ]
    }
}

#[derive(Debug)]
struct StoreEntry {
    state: SelectionState,
    touched: Instant,
}

/// Explicit store for in-flight selections, keyed by conversation and
/// message. Entries expire after the time-to-live and are evicted on any
/// access; cancellation releases an entry immediately.
#[derive(Debug)]
pub(crate) struct SelectorStore {
    states: HashMap<(String, String), StoreEntry>,
    ttl: Duration,
}

impl SelectorStore {
    pub(crate) fn new(ttl: Duration) -> Self {
        SelectorStore {
            states: HashMap::default(),
            ttl,
        }
    }

    fn prune(&mut self) {
        let ttl = self.ttl;
        self.states
            .retain(|_, entry| entry.touched.elapsed() <= ttl);
    }

    pub(crate) fn save(&mut self, conversation: &str, state: SelectionState) {
        self.prune();
        self.states.insert(
            (conversation.to_string(), state.id.clone()),
            StoreEntry {
                state,
                touched: Instant::now(),
            },
        );
    }

    pub(crate) fn take(
        &mut self,
        conversation: &str,
        id: &str,
    ) -> Result<SelectionState, SelectorError> {
        self.prune();
        self.states
            .remove(&(conversation.to_string(), id.to_string()))
            .map(|entry| entry.state)
            .ok_or_else(|| SelectorError::UnknownState(id.to_string()))
    }

    pub(crate) fn cancel(&mut self, conversation: &str, id: &str) {
        self.states
            .remove(&(conversation.to_string(), id.to_string()));
        tracing::debug!("selection {id} cancelled");
    }

    /// Fetch, advance, and either return the resolved transaction or save
    /// the updated state back with a fresh timestamp.
    pub(crate) fn advance(
        &mut self,
        conversation: &str,
        id: &str,
        choice: Choice,
        ledger: &Ledger,
    ) -> Result<Outcome, SelectorError> {
        let mut state = self.take(conversation, id)?;
        match state.advance(choice, ledger) {
            Ok(Step::Resolved) => Ok(Outcome::Resolved(state.tx)),
            Ok(Step::Pending) => {
                let buttons = state.buttons();
                self.save(conversation, state);
                Ok(Outcome::Pending(buttons))
            }
            Err(err) => Err(err), // state discarded, recoverable by restarting
        }
    }
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Resolved(Transaction),
    Pending(Vec<Button>),
}
