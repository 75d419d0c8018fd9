//! Ledger engine.
//!
//! Records transactions against accounts and payees and keeps account
//! balances in step with them. Every write operation runs in one database
//! transaction: it either commits all of its rows or none.
//!
//! The entry point is [`Engine`], built with [`Engine::builder`].

pub use accounts::{Account, NewAccount};
pub use balance::Balance;
pub use error::{EngineError, ReferenceError, ValidationErrors};
pub use ids::{AccountId, PayeeId, TransactionId};
pub use money::Amount;
pub use ops::{Engine, EngineBuilder};
pub use payees::Payee;
pub use transactions::{Counterparty, NewTransaction, Transaction, ValidTo, Validity};

mod accounts;
mod balance;
mod clock;
mod error;
mod ids;
mod money;
mod ops;
mod payees;
mod store;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
