//! The module contains `Account` and its storage mapping.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, Balance, EngineError, ResultEngine};

/// A balance-holding account (a bank account, a card, a cash pot).
///
/// The balance is derived: it only changes when a committed batch of
/// transactions applies its per-account delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance: Balance,
}

impl Account {
    /// Add `delta` to the balance. On overflow the balance is left as it was.
    pub fn apply(&mut self, delta: Balance) -> ResultEngine<()> {
        self.balance = self.balance.checked_add(delta).map_err(|err| {
            EngineError::InvalidAmount(format!("account {}: {err}", self.id))
        })?;
        Ok(())
    }
}

/// Input for [`Engine::create_accounts`](crate::Engine::create_accounts).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    #[serde(default = "AccountId::generate")]
    pub id: AccountId,
    pub name: String,
}

impl NewAccount {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AccountId::generate(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<AccountId>) -> Self {
        self.id = id.into();
        self
    }
}

impl From<NewAccount> for Account {
    fn from(value: NewAccount) -> Self {
        Self {
            id: value.id,
            name: value.name,
            balance: Balance::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub cleared_balance: i64,
    pub pending_balance: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            cleared_balance: ActiveValue::Set(value.balance.cleared.minor()),
            pending_balance: ActiveValue::Set(value.balance.pending.minor()),
        }
    }
}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: AccountId::from(model.id),
            name: model.name,
            balance: Balance::new(
                Amount::new(model.cleared_balance),
                Amount::new(model.pending_balance),
            ),
        }
    }
}
