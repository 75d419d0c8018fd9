use std::collections::BTreeSet;

use sea_orm::{AccessMode, ConnectionTrait};

use crate::{Account, AccountId, EngineError, NewAccount, ResultEngine, store};

use super::{Engine, ensure_names, with_tx};

impl Engine {
    /// Add accounts with a zero balance.
    ///
    /// Fails with [`EngineError::ExistingKey`] if any id is already taken,
    /// in the store or twice in `accounts`.
    pub async fn create_accounts(&self, accounts: Vec<NewAccount>) -> ResultEngine<Vec<Account>> {
        let accounts: Vec<Account> = accounts.into_iter().map(Account::from).collect();
        ensure_names(
            "account",
            accounts.iter().map(|a| (a.id.as_str(), a.name.as_str())),
        )?;
        with_tx!(self, AccessMode::ReadWrite, |db_tx| {
            create_accounts_in(&db_tx, accounts).await
        })
    }

    /// Return an account snapshot from DB.
    pub async fn account(&self, account_id: &AccountId) -> ResultEngine<Account> {
        with_tx!(self, AccessMode::ReadOnly, |db_tx| {
            account_in(&db_tx, account_id).await
        })
    }

    /// All accounts, by name.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, AccessMode::ReadOnly, |db_tx| {
            store::select_all_accounts(&db_tx).await
        })
    }
}

async fn create_accounts_in<C: ConnectionTrait>(
    conn: &C,
    accounts: Vec<Account>,
) -> ResultEngine<Vec<Account>> {
    let mut ids = BTreeSet::new();
    for account in &accounts {
        if !ids.insert(account.id.clone()) {
            return Err(EngineError::ExistingKey(account.id.to_string()));
        }
    }
    if let Some(existing) = store::select_accounts_by_id(conn, &ids).await?.keys().min() {
        return Err(EngineError::ExistingKey(existing.to_string()));
    }

    store::insert_accounts(conn, &accounts).await?;
    tracing::info!("created {} accounts", accounts.len());
    Ok(accounts)
}

async fn account_in<C: ConnectionTrait>(conn: &C, account_id: &AccountId) -> ResultEngine<Account> {
    let ids = BTreeSet::from([account_id.clone()]);
    store::select_accounts_by_id(conn, &ids)
        .await?
        .remove(account_id)
        .ok_or_else(|| EngineError::KeyNotFound(account_id.to_string()))
}
