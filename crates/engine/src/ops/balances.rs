use std::collections::{BTreeSet, HashMap};

use sea_orm::{AccessMode, ConnectionTrait};

use crate::{Account, AccountId, Balance, EngineError, ResultEngine, Transaction, store};

use super::{Engine, with_tx};

/// Net balance change per account implied by `transactions`.
///
/// Accounts no transaction touches get no entry. Fails with
/// [`EngineError::InvalidAmount`] if an account's delta overflows.
pub(super) fn balance_changes_by_account(
    transactions: &[Transaction],
) -> ResultEngine<HashMap<AccountId, Balance>> {
    let mut changes: HashMap<AccountId, Balance> = HashMap::with_capacity(transactions.len());
    for tx in transactions {
        let entry = changes.entry(tx.account_id.clone()).or_default();
        *entry = entry.add_amount(tx.amount, tx.cleared).map_err(|err| {
            EngineError::InvalidAmount(format!("account {}: {err}", tx.account_id))
        })?;
    }
    Ok(changes)
}

/// Load the accounts in `changes`, add their delta and write them back.
pub(super) async fn apply_balance_changes<C: ConnectionTrait>(
    conn: &C,
    changes: &HashMap<AccountId, Balance>,
) -> ResultEngine<Vec<Account>> {
    let ids: BTreeSet<AccountId> = changes.keys().cloned().collect();
    let mut accounts = store::select_accounts_by_id(conn, &ids).await?;

    let mut updated = Vec::with_capacity(ids.len());
    for id in &ids {
        let mut account = accounts
            .remove(id)
            .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))?;
        account.apply(changes[id])?;
        updated.push(account);
    }

    store::insert_accounts(conn, &updated).await?;
    Ok(updated)
}

impl Engine {
    /// Recomputes every account balance from the active ledger rows.
    ///
    /// Accounts without active transactions are reset to zero.
    pub async fn recompute_balances(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, AccessMode::ReadWrite, |db_tx| {
            recompute_balances_in(&db_tx).await
        })
    }
}

async fn recompute_balances_in<C: ConnectionTrait>(conn: &C) -> ResultEngine<Vec<Account>> {
    let transactions = store::select_active_transactions(conn, None).await?;
    let changes = balance_changes_by_account(&transactions)?;

    let mut accounts = store::select_all_accounts(conn).await?;
    for account in &mut accounts {
        account.balance = changes.get(&account.id).copied().unwrap_or_default();
    }

    store::insert_accounts(conn, &accounts).await?;
    tracing::info!(
        "recomputed balances of {} accounts from {} transactions",
        accounts.len(),
        transactions.len()
    );
    Ok(accounts)
}
