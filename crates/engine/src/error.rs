//! The module contains the errors the engine can return.
//!
//! Reference validation never stops at the first problem: every missing
//! account and payee of a batch is collected into one [`ValidationErrors`],
//! surfaced as [`EngineError::Validation`]. Store failures carry the
//! operation that was being attempted.
use std::fmt;

use sea_orm::DbErr;
use thiserror::Error;

use crate::{AccountId, PayeeId};

/// One kind of dangling reference found in a batch.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("transactions reference accounts that do not exist: [{}]", join(.account_ids))]
    MissingAccounts { account_ids: Vec<AccountId> },
    #[error("transactions reference payees that do not exist: [{}]", join(.payee_ids))]
    MissingPayees { payee_ids: Vec<PayeeId> },
}

fn join<T: fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every reference problem of a batch, in a stable order (accounts first).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ReferenceError>);

impl ValidationErrors {
    pub fn push(&mut self, error: ReferenceError) {
        self.0.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ReferenceError] {
        &self.0
    }

    /// All missing account ids across the collected errors.
    pub fn missing_accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.0
            .iter()
            .filter_map(|e| match e {
                ReferenceError::MissingAccounts { account_ids } => Some(account_ids),
                ReferenceError::MissingPayees { .. } => None,
            })
            .flatten()
    }

    /// All missing payee ids across the collected errors.
    pub fn missing_payees(&self) -> impl Iterator<Item = &PayeeId> {
        self.0
            .iter()
            .filter_map(|e| match e {
                ReferenceError::MissingPayees { payee_ids } => Some(payee_ids),
                ReferenceError::MissingAccounts { .. } => None,
            })
            .flatten()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: DbErr,
    },
    #[error("{context}: expected {expected} rows, wrote {written}")]
    IncompleteWrite {
        context: &'static str,
        expected: u64,
        written: u64,
    },
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("operation timed out")]
    Timeout,
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Wraps a store error with the operation that failed.
    pub(crate) fn store(context: &'static str) -> impl FnOnce(DbErr) -> EngineError {
        move |source| EngineError::Store { context, source }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::Store {
                    context: a,
                    source: sa,
                },
                Self::Store {
                    context: b,
                    source: sb,
                },
            ) => a == b && sa.to_string() == sb.to_string(),
            (
                Self::IncompleteWrite {
                    context: a,
                    expected: ea,
                    written: wa,
                },
                Self::IncompleteWrite {
                    context: b,
                    expected: eb,
                    written: wb,
                },
            ) => a == b && ea == eb && wa == wb,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::Timeout, Self::Timeout) => true,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
