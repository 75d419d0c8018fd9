use std::collections::{BTreeSet, HashMap};

use sea_orm::ConnectionTrait;

use crate::{
    Account, AccountId, Counterparty, NewTransaction, Payee, PayeeId, ReferenceError,
    ResultEngine, ValidationErrors, store, util::missing,
};

/// Ids a batch refers to, deduplicated per table.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct References {
    pub accounts: BTreeSet<AccountId>,
    pub payees: BTreeSet<PayeeId>,
}

impl References {
    pub fn of(transactions: &[NewTransaction]) -> Self {
        let mut refs = Self::default();
        for tx in transactions {
            refs.accounts.insert(tx.account_id.clone());
            match &tx.payee {
                Counterparty::Internal { account_id } => {
                    refs.accounts.insert(account_id.clone());
                }
                Counterparty::External { payee_id } => {
                    refs.payees.insert(payee_id.clone());
                }
            }
        }
        refs
    }

    /// Every requested id missing from the found sets, both kinds at once.
    pub fn check(
        &self,
        found_accounts: &HashMap<AccountId, Account>,
        found_payees: &HashMap<PayeeId, Payee>,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let account_ids = missing(&self.accounts, found_accounts);
        if !account_ids.is_empty() {
            errors.push(ReferenceError::MissingAccounts { account_ids });
        }
        let payee_ids = missing(&self.payees, found_payees);
        if !payee_ids.is_empty() {
            errors.push(ReferenceError::MissingPayees { payee_ids });
        }

        errors.into_result()
    }
}

/// Check that every account and payee referenced by `transactions` exists.
///
/// Read-only. All missing references are reported together.
pub(super) async fn validate_references<C: ConnectionTrait>(
    conn: &C,
    transactions: &[NewTransaction],
) -> ResultEngine<()> {
    let refs = References::of(transactions);
    let found_accounts = store::select_accounts_by_id(conn, &refs.accounts).await?;
    let found_payees = store::select_payees_by_id(conn, &refs.payees).await?;

    if let Err(errors) = refs.check(&found_accounts, &found_payees) {
        tracing::warn!("rejecting batch of {} transactions: {errors}", transactions.len());
        return Err(errors.into());
    }
    Ok(())
}
