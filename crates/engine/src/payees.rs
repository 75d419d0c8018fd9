//! External counterparties.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::PayeeId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    #[serde(default = "PayeeId::generate")]
    pub id: PayeeId,
    pub name: String,
}

impl Payee {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PayeeId::generate(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<PayeeId>) -> Self {
        self.id = id.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payee> for ActiveModel {
    fn from(value: &Payee) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
        }
    }
}

impl From<Model> for Payee {
    fn from(model: Model) -> Self {
        Self {
            id: PayeeId::from(model.id),
            name: model.name,
        }
    }
}
