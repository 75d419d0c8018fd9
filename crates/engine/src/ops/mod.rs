use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod accounts;
mod balances;
mod payees;
mod transactions;
mod validate;

/// Run a block inside a DB transaction opened with the given
/// [`AccessMode`](sea_orm::AccessMode), committing on success and rolling back
/// on error.
///
/// Once the block returns `Ok` the commit is always awaited and its outcome
/// is what the caller sees.
macro_rules! with_tx {
    ($self:expr, $mode:expr, |$tx:ident| $body:expr) => {{
        let $tx =
            sea_orm::TransactionTrait::begin_with_config(&$self.database, None, Some($mode))
                .await
                .map_err($crate::EngineError::store("beginning transaction"))?;
        let result: $crate::ResultEngine<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::EngineError::store("committing transaction"))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn ensure_names<'a>(
    kind: &str,
    named: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> ResultEngine<()> {
    for (id, name) in named {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidName(format!(
                "{kind} {id} name must not be empty"
            )));
        }
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
