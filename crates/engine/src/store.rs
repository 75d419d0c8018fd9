//! Repository operations.
//!
//! Every function takes the connection it runs on, which is the open
//! `DatabaseTransaction` of the calling operation. Nothing here commits.

use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ConnectionTrait, Iterable, QueryFilter, QueryOrder, prelude::*, sea_query::OnConflict,
};

use crate::{
    Account, AccountId, EngineError, Payee, PayeeId, ResultEngine, Transaction, TransactionId,
    accounts, payees, transactions, util::index_by,
};

/// Bind parameters allowed in one statement. SQLite builds before 3.32
/// stop at 999, later ones at 32766.
const MAX_BIND_PARAMS: usize = 999;

/// Rows of an entity with `C` columns that fit in one statement.
fn rows_per_statement<C: Iterable>() -> usize {
    (MAX_BIND_PARAMS / C::iter().count().max(1)).max(1)
}

fn ensure_written(context: &'static str, expected: usize, written: u64) -> ResultEngine<()> {
    let expected = expected as u64;
    if written != expected {
        return Err(EngineError::IncompleteWrite {
            context,
            expected,
            written,
        });
    }
    Ok(())
}

/// Insert transaction rows, returning their ids in input order.
///
/// Fails with [`EngineError::IncompleteWrite`] unless every row was written.
pub(crate) async fn insert_transactions<C: ConnectionTrait>(
    conn: &C,
    rows: &[Transaction],
) -> ResultEngine<Vec<TransactionId>> {
    const CONTEXT: &str = "inserting transactions";
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!(count = rows.len(), "inserting transactions");

    let mut written = 0;
    for chunk in rows.chunks(rows_per_statement::<transactions::Column>()) {
        let models = chunk.iter().map(transactions::ActiveModel::from);
        written += transactions::Entity::insert_many(models)
            .exec_without_returning(conn)
            .await
            .map_err(EngineError::store(CONTEXT))?;
    }
    ensure_written(CONTEXT, rows.len(), written)?;

    tracing::debug!(written, "inserted transactions");
    Ok(rows.iter().map(|tx| tx.id.clone()).collect())
}

/// Insert accounts, overwriting name and balance of rows that already exist.
pub(crate) async fn insert_accounts<C: ConnectionTrait>(
    conn: &C,
    rows: &[Account],
) -> ResultEngine<Vec<AccountId>> {
    const CONTEXT: &str = "inserting accounts";
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!(count = rows.len(), "inserting accounts");

    let on_conflict = OnConflict::column(accounts::Column::Id)
        .update_columns([
            accounts::Column::Name,
            accounts::Column::ClearedBalance,
            accounts::Column::PendingBalance,
        ])
        .to_owned();
    let mut written = 0;
    for chunk in rows.chunks(rows_per_statement::<accounts::Column>()) {
        let models = chunk.iter().map(accounts::ActiveModel::from);
        written += accounts::Entity::insert_many(models)
            .on_conflict(on_conflict.clone())
            .exec_without_returning(conn)
            .await
            .map_err(EngineError::store(CONTEXT))?;
    }
    ensure_written(CONTEXT, rows.len(), written)?;

    Ok(rows.iter().map(|account| account.id.clone()).collect())
}

pub(crate) async fn insert_payees<C: ConnectionTrait>(
    conn: &C,
    rows: &[Payee],
) -> ResultEngine<Vec<PayeeId>> {
    const CONTEXT: &str = "inserting payees";
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!(count = rows.len(), "inserting payees");

    let mut written = 0;
    for chunk in rows.chunks(rows_per_statement::<payees::Column>()) {
        let models = chunk.iter().map(payees::ActiveModel::from);
        written += payees::Entity::insert_many(models)
            .exec_without_returning(conn)
            .await
            .map_err(EngineError::store(CONTEXT))?;
    }
    ensure_written(CONTEXT, rows.len(), written)?;

    Ok(rows.iter().map(|payee| payee.id.clone()).collect())
}

pub(crate) async fn select_accounts_by_id<C: ConnectionTrait>(
    conn: &C,
    ids: &BTreeSet<AccountId>,
) -> ResultEngine<HashMap<AccountId, Account>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    tracing::debug!(count = ids.len(), "selecting accounts");

    let ids: Vec<&str> = ids.iter().map(AccountId::as_str).collect();
    let mut found = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BIND_PARAMS) {
        let models = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(chunk.iter().copied()))
            .all(conn)
            .await
            .map_err(EngineError::store("selecting accounts"))?;
        found.extend(index_by(models.into_iter().map(Account::from), |account| {
            account.id.clone()
        }));
    }
    Ok(found)
}

pub(crate) async fn select_payees_by_id<C: ConnectionTrait>(
    conn: &C,
    ids: &BTreeSet<PayeeId>,
) -> ResultEngine<HashMap<PayeeId, Payee>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    tracing::debug!(count = ids.len(), "selecting payees");

    let ids: Vec<&str> = ids.iter().map(PayeeId::as_str).collect();
    let mut found = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BIND_PARAMS) {
        let models = payees::Entity::find()
            .filter(payees::Column::Id.is_in(chunk.iter().copied()))
            .all(conn)
            .await
            .map_err(EngineError::store("selecting payees"))?;
        found.extend(index_by(models.into_iter().map(Payee::from), |payee| {
            payee.id.clone()
        }));
    }
    Ok(found)
}

pub(crate) async fn select_all_accounts<C: ConnectionTrait>(
    conn: &C,
) -> ResultEngine<Vec<Account>> {
    let models = accounts::Entity::find()
        .order_by_asc(accounts::Column::Name)
        .order_by_asc(accounts::Column::Id)
        .all(conn)
        .await
        .map_err(EngineError::store("selecting accounts"))?;
    Ok(models.into_iter().map(Account::from).collect())
}

pub(crate) async fn select_all_payees<C: ConnectionTrait>(
    conn: &C,
) -> ResultEngine<Vec<Payee>> {
    let models = payees::Entity::find()
        .order_by_asc(payees::Column::Name)
        .order_by_asc(payees::Column::Id)
        .all(conn)
        .await
        .map_err(EngineError::store("selecting payees"))?;
    Ok(models.into_iter().map(Payee::from).collect())
}

/// Active rows (open validity window), optionally restricted to one account.
pub(crate) async fn select_active_transactions<C: ConnectionTrait>(
    conn: &C,
    account_id: Option<&AccountId>,
) -> ResultEngine<Vec<Transaction>> {
    let mut query =
        transactions::Entity::find().filter(transactions::Column::ValidToTimestamp.is_null());
    if let Some(account_id) = account_id {
        query = query.filter(transactions::Column::AccountId.eq(account_id.as_str()));
    }
    let models = query
        .order_by_asc(transactions::Column::EffectiveDate)
        .order_by_asc(transactions::Column::Id)
        .all(conn)
        .await
        .map_err(EngineError::store("selecting transactions"))?;
    Ok(models.into_iter().map(Transaction::from).collect())
}
