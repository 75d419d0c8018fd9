use std::collections::BTreeSet;

use sea_orm::{AccessMode, ConnectionTrait};

use crate::{EngineError, Payee, ResultEngine, store};

use super::{Engine, ensure_names, with_tx};

impl Engine {
    /// Add external payees.
    pub async fn create_payees(&self, payees: Vec<Payee>) -> ResultEngine<Vec<Payee>> {
        ensure_names(
            "payee",
            payees.iter().map(|p| (p.id.as_str(), p.name.as_str())),
        )?;
        with_tx!(self, AccessMode::ReadWrite, |db_tx| {
            create_payees_in(&db_tx, payees).await
        })
    }

    /// All payees, by name.
    pub async fn payees(&self) -> ResultEngine<Vec<Payee>> {
        with_tx!(self, AccessMode::ReadOnly, |db_tx| {
            store::select_all_payees(&db_tx).await
        })
    }
}

async fn create_payees_in<C: ConnectionTrait>(
    conn: &C,
    payees: Vec<Payee>,
) -> ResultEngine<Vec<Payee>> {
    let mut ids = BTreeSet::new();
    for payee in &payees {
        if !ids.insert(payee.id.clone()) {
            return Err(EngineError::ExistingKey(payee.id.to_string()));
        }
    }
    if let Some(existing) = store::select_payees_by_id(conn, &ids).await?.keys().min() {
        return Err(EngineError::ExistingKey(existing.to_string()));
    }

    store::insert_payees(conn, &payees).await?;
    tracing::info!("created {} payees", payees.len());
    Ok(payees)
}
