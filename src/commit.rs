use std::{fs, io, path::Path};

use crate::{
    config::Config,
    errors::{CommitError, SyncError},
    format,
    ledger::Ledger,
    sync::Synchronizer,
    transaction::{self, Transaction},
};

/// Balance shown when the validating load cannot answer for an account.
pub(crate) const UNKNOWN_BALANCE: &str = "unknown";

/// What a successful commit reports back: post-commit balances of the two
/// touched accounts, and a push failure if the remote rejected the durable
/// local write.
#[derive(Debug)]
pub(crate) struct CommitOutcome {
    pub(crate) source_balance: String,
    pub(crate) category_balance: String,
    pub(crate) sync_error: Option<SyncError>,
}

fn read_or_empty(path: &Path) -> Result<String, io::Error> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err),
    }
}

/// Append one transaction to the given ledger file and make it durable.
///
/// Pull, render, append, re-align, revalidate against the full ledger root,
/// push. A revalidation failure restores the pre-append bytes exactly and
/// reports the engine's account of the problem. A push failure is surfaced
/// on the outcome without undoing the local write.
pub(crate) fn commit(
    tx: &mut Transaction,
    file: &str,
    config: &Config,
    sync: &dyn Synchronizer,
) -> Result<CommitOutcome, CommitError> {
    sync.pull()?;

    if tx.source_account.is_empty() {
        tx.source_account = config.source_account.clone();
    }

    let path = config.root.join(file);
    let original = read_or_empty(&path)?;

    // category root from the current ledger, so renders agree with it
    let ledger = Ledger::load(&config.main_path())?;
    let entry = tx.render(transaction::today(), &config.currency, ledger.category_root())?;

    let updated = format::align(&format!("{original}{entry}"));

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
            }
        }
    }
    fs::write(&path, &updated)?;

    let reloaded = match Ledger::load(&config.main_path()) {
        Ok(reloaded) => reloaded,
        Err(err) => {
            tracing::debug!("new entry rejected, rolling back {:?}", &path);
            fs::write(&path, &original)?;
            return Err(CommitError::Rejected(err));
        }
    };

    let message = format!("beanbot: {}", tx.narration);
    let sync_error = sync.push(file, &message).err();

    let balance = |account: &Option<String>| {
        account
            .as_deref()
            .and_then(|account| reloaded.balance(account))
            .unwrap_or_else(|| UNKNOWN_BALANCE.to_string())
    };

    Ok(CommitOutcome {
        source_balance: reloaded
            .balance(&tx.source_account)
            .unwrap_or_else(|| UNKNOWN_BALANCE.to_string()),
        category_balance: balance(&tx.category_account),
        sync_error,
    })
}
