//! Account balances.
//!
//! A [`Balance`] keeps settled and unsettled money apart: a transaction
//! contributes to the `cleared` bucket once it has cleared, and to `pending`
//! until then.

use serde::{Deserialize, Serialize};

use crate::{Amount, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub cleared: Amount,
    pub pending: Amount,
}

fn overflow(what: &str) -> EngineError {
    EngineError::InvalidAmount(format!("{what} overflows"))
}

impl Balance {
    pub const ZERO: Balance = Balance {
        cleared: Amount::ZERO,
        pending: Amount::ZERO,
    };

    #[must_use]
    pub const fn new(cleared: Amount, pending: Amount) -> Self {
        Self { cleared, pending }
    }

    /// Returns this balance with `amount` added to the cleared or pending
    /// bucket.
    ///
    /// Fails with [`EngineError::InvalidAmount`] if the bucket overflows.
    pub fn add_amount(self, amount: Amount, cleared: bool) -> ResultEngine<Self> {
        if cleared {
            let cleared = self
                .cleared
                .checked_add(amount)
                .ok_or_else(|| overflow("cleared balance"))?;
            Ok(Self { cleared, ..self })
        } else {
            let pending = self
                .pending
                .checked_add(amount)
                .ok_or_else(|| overflow("pending balance"))?;
            Ok(Self { pending, ..self })
        }
    }

    /// Bucket-wise sum.
    pub fn checked_add(self, rhs: Balance) -> ResultEngine<Self> {
        let balance = self.add_amount(rhs.cleared, true)?;
        balance.add_amount(rhs.pending, false)
    }

    /// Cleared plus pending, `None` on overflow.
    #[must_use]
    pub fn total(self) -> Option<Amount> {
        self.cleared.checked_add(self.pending)
    }
}
