//! Transaction primitives.
//!
//! A [`Transaction`] is one ledger leg: an amount booked against a single
//! account, with a counterparty. Money moved between two accounts of the
//! same ledger (a transfer) is booked as two legs: the one the caller
//! supplied and its [mirror](NewTransaction::mirror).
//!
//! Rows are bitemporal. Each stored row carries a [`Validity`] window and the
//! active version of a row has an open end ([`ValidTo::Infinity`]).

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, EngineError, PayeeId, ResultEngine, TransactionId};

/// Who is on the other side of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Counterparty {
    /// A payee outside the ledger (a shop, an employer).
    External { payee_id: PayeeId },
    /// Another account of the same ledger: the transaction is a transfer.
    Internal { account_id: AccountId },
}

impl Counterparty {
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// The raw payee id, whichever table it points into.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::External { payee_id } => payee_id.as_str(),
            Self::Internal { account_id } => account_id.as_str(),
        }
    }

    fn from_columns(payee_id: String, is_payee_internal: bool) -> Self {
        if is_payee_internal {
            Self::Internal {
                account_id: AccountId::from(payee_id),
            }
        } else {
            Self::External {
                payee_id: PayeeId::from(payee_id),
            }
        }
    }
}

/// End of a row's validity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidTo {
    /// The row is the active version.
    Infinity,
    At(DateTime<Utc>),
}

/// The `[valid_from, valid_to)` window of a stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub valid_from: DateTime<Utc>,
    pub valid_to: ValidTo,
}

impl Validity {
    /// A window starting at `valid_from` that never ends.
    #[must_use]
    pub fn open(valid_from: DateTime<Utc>) -> Self {
        Self {
            valid_from,
            valid_to: ValidTo::Infinity,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.valid_to == ValidTo::Infinity
    }
}

/// A transaction that has not been stored yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(default = "TransactionId::generate")]
    pub id: TransactionId,
    pub effective_date: NaiveDate,
    pub account_id: AccountId,
    pub payee: Counterparty,
    pub amount: Amount,
    #[serde(default)]
    pub cleared: bool,
}

impl NewTransaction {
    /// Create a pending transaction with a fresh id.
    #[must_use]
    pub fn new(
        effective_date: NaiveDate,
        account_id: impl Into<AccountId>,
        payee: Counterparty,
        amount_minor: i64,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            effective_date,
            account_id: account_id.into(),
            payee,
            amount: Amount::new(amount_minor),
            cleared: false,
        }
    }

    /// A transaction against an external payee.
    #[must_use]
    pub fn external(
        effective_date: NaiveDate,
        account_id: impl Into<AccountId>,
        payee_id: impl Into<PayeeId>,
        amount_minor: i64,
    ) -> Self {
        Self::new(
            effective_date,
            account_id,
            Counterparty::External {
                payee_id: payee_id.into(),
            },
            amount_minor,
        )
    }

    /// The `account_id` leg of a transfer to (or from) `counter_account_id`.
    ///
    /// Only this leg is supplied; the opposite one is generated on create.
    #[must_use]
    pub fn transfer(
        effective_date: NaiveDate,
        account_id: impl Into<AccountId>,
        counter_account_id: impl Into<AccountId>,
        amount_minor: i64,
    ) -> Self {
        Self::new(
            effective_date,
            account_id,
            Counterparty::Internal {
                account_id: counter_account_id.into(),
            },
            amount_minor,
        )
    }

    #[must_use]
    pub fn cleared(mut self, cleared: bool) -> Self {
        self.cleared = cleared;
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<TransactionId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn payee_id(&self) -> &str {
        self.payee.id()
    }

    #[must_use]
    pub fn is_payee_internal(&self) -> bool {
        self.payee.is_internal()
    }

    /// The opposite leg of a transfer: accounts swapped, amount negated.
    ///
    /// Returns `Ok(None)` for transactions with an external payee, and
    /// [`EngineError::InvalidAmount`] when the amount has no negation.
    pub fn mirror(&self, id: TransactionId) -> ResultEngine<Option<NewTransaction>> {
        let Counterparty::Internal { account_id } = &self.payee else {
            return Ok(None);
        };
        let amount = self.amount.checked_neg().ok_or_else(|| {
            EngineError::InvalidAmount(format!(
                "transaction {}: amount {} cannot be mirrored",
                self.id, self.amount
            ))
        })?;
        Ok(Some(NewTransaction {
            id,
            effective_date: self.effective_date,
            account_id: account_id.clone(),
            payee: Counterparty::Internal {
                account_id: self.account_id.clone(),
            },
            amount,
            cleared: self.cleared,
        }))
    }

    pub(crate) fn stamp(self, validity: Validity) -> Transaction {
        Transaction {
            id: self.id,
            effective_date: self.effective_date,
            account_id: self.account_id,
            payee: self.payee,
            amount: self.amount,
            cleared: self.cleared,
            validity,
        }
    }
}

/// A stored ledger row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub effective_date: NaiveDate,
    pub account_id: AccountId,
    pub payee: Counterparty,
    pub amount: Amount,
    pub cleared: bool,
    pub validity: Validity,
}

impl Transaction {
    #[must_use]
    pub fn payee_id(&self) -> &str {
        self.payee.id()
    }

    #[must_use]
    pub fn is_payee_internal(&self) -> bool {
        self.payee.is_internal()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub effective_date: Date,
    pub account_id: String,
    pub payee_id: String,
    pub is_payee_internal: bool,
    pub amount: i64,
    pub cleared: bool,
    pub valid_from_timestamp: DateTimeUtc,
    /// `None` is +infinity.
    pub valid_to_timestamp: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            effective_date: ActiveValue::Set(tx.effective_date),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            payee_id: ActiveValue::Set(tx.payee_id().to_string()),
            is_payee_internal: ActiveValue::Set(tx.is_payee_internal()),
            amount: ActiveValue::Set(tx.amount.minor()),
            cleared: ActiveValue::Set(tx.cleared),
            valid_from_timestamp: ActiveValue::Set(tx.validity.valid_from),
            valid_to_timestamp: ActiveValue::Set(match tx.validity.valid_to {
                ValidTo::Infinity => None,
                ValidTo::At(at) => Some(at),
            }),
        }
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: TransactionId::from(model.id),
            effective_date: model.effective_date,
            account_id: AccountId::from(model.account_id),
            payee: Counterparty::from_columns(model.payee_id, model.is_payee_internal),
            amount: Amount::new(model.amount),
            cleared: model.cleared,
            validity: Validity {
                valid_from: model.valid_from_timestamp,
                valid_to: model
                    .valid_to_timestamp
                    .map_or(ValidTo::Infinity, ValidTo::At),
            },
        }
    }
}
