use std::{collections::BTreeSet, time::Duration};

use chrono::{DateTime, Utc};
use sea_orm::{AccessMode, ConnectionTrait};

use crate::{
    AccountId, EngineError, NewTransaction, ResultEngine, Transaction, TransactionId, Validity,
    clock, store,
};

use super::{
    Engine,
    balances::{apply_balance_changes, balance_changes_by_account},
    validate::validate_references,
    with_tx,
};

/// Append the opposite leg of every transfer, after all originals.
pub(super) fn append_mirrors(
    mut transactions: Vec<NewTransaction>,
) -> ResultEngine<Vec<NewTransaction>> {
    let mut mirrors = Vec::new();
    for tx in &transactions {
        if let Some(mirror) = tx.mirror(TransactionId::generate())? {
            mirrors.push(mirror);
        }
    }
    transactions.extend(mirrors);
    Ok(transactions)
}

/// Give every row the same open validity window starting at `now`.
fn stamp(transactions: Vec<NewTransaction>, now: DateTime<Utc>) -> Vec<Transaction> {
    let validity = Validity::open(now);
    transactions
        .into_iter()
        .map(|tx| tx.stamp(validity))
        .collect()
}

impl Engine {
    /// Create a batch of transactions and update the balances of the
    /// accounts they touch.
    ///
    /// - Every referenced account and payee must exist; all missing ones are
    ///   reported at once in [`EngineError::Validation`].
    /// - Each transfer (payee is an account) gets its mirror leg appended.
    /// - All rows share one `valid_from` read from the store and an open
    ///   `valid_to`.
    ///
    /// Returns the stored rows, originals first and mirrors after. Nothing is
    /// written unless everything is.
    pub async fn create_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> ResultEngine<Vec<Transaction>> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        with_tx!(self, AccessMode::ReadWrite, |db_tx| {
            create_transactions_in(&db_tx, transactions).await
        })
    }

    /// [`create_transactions`](Self::create_transactions) with a deadline on
    /// the work done inside the DB transaction.
    ///
    /// When the deadline passes before the batch is fully written, the
    /// pending store call is dropped, the DB transaction is rolled back and
    /// [`EngineError::Timeout`] is returned. The commit itself is not bounded:
    /// once every row is written the result reflects what was committed.
    pub async fn create_transactions_with_timeout(
        &self,
        transactions: Vec<NewTransaction>,
        timeout: Duration,
    ) -> ResultEngine<Vec<Transaction>> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        with_tx!(self, AccessMode::ReadWrite, |db_tx| {
            let work = create_transactions_in(&db_tx, transactions);
            match tokio::time::timeout(timeout, work).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("batch timed out after {timeout:?}, rolling back");
                    Err(EngineError::Timeout)
                }
            }
        })
    }

    /// Active transactions of an account, by effective date.
    pub async fn active_transactions(
        &self,
        account_id: &AccountId,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, AccessMode::ReadOnly, |db_tx| {
            active_transactions_in(&db_tx, account_id).await
        })
    }
}

async fn create_transactions_in<C: ConnectionTrait>(
    conn: &C,
    transactions: Vec<NewTransaction>,
) -> ResultEngine<Vec<Transaction>> {
    validate_references(conn, &transactions).await?;

    let transactions = append_mirrors(transactions)?;
    let now = clock::now(conn).await?;
    let transactions = stamp(transactions, now);

    store::insert_transactions(conn, &transactions).await?;

    let changes = balance_changes_by_account(&transactions)?;
    let accounts = apply_balance_changes(conn, &changes).await?;

    // TODO: propagate the batch into category balances once categories exist.

    tracing::info!(
        "created {} transactions, updated {} account balances",
        transactions.len(),
        accounts.len()
    );
    Ok(transactions)
}

async fn active_transactions_in<C: ConnectionTrait>(
    conn: &C,
    account_id: &AccountId,
) -> ResultEngine<Vec<Transaction>> {
    let ids = BTreeSet::from([account_id.clone()]);
    if store::select_accounts_by_id(conn, &ids).await?.is_empty() {
        return Err(EngineError::KeyNotFound(account_id.to_string()));
    }
    store::select_active_transactions(conn, Some(account_id)).await
}
