//! The advance aggregate.
//!
//! `balance_remaining` is private. It changes only through [`Advance::consume`],
//! [`Advance::refund`] and [`Advance::reinstate`], each of which keeps
//! `0 <= balance_remaining <= amount` and leaves the advance untouched when it
//! fails.

use chrono::NaiveDate;
use lexledger_shared::types::{
    AdvanceId, ClientId, Currency, CurrencyTotals, LawyerId, MatterId, Money, TenantId,
};
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{AdvanceOwner, AdvanceParts, AdvanceStatus, AdvanceType, NewAdvance};
use crate::error::BillingError;

/// A deposit held on behalf of a client or lawyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advance {
    id: AdvanceId,
    tenant_id: TenantId,
    owner: AdvanceOwner,
    matter_id: Option<MatterId>,
    advance_type: AdvanceType,
    amount: Decimal,
    currency: Currency,
    date_received: NaiveDate,
    balance_remaining: Decimal,
    status: AdvanceStatus,
}

impl Advance {
    /// Records a deposit. The full amount is available and the advance is active.
    pub fn deposit(input: NewAdvance) -> Result<Self, BillingError> {
        if !input.amount.is_positive() {
            return Err(BillingError::validation("amount", "must be greater than zero"));
        }
        BillingError::check_scale("amount", input.amount)?;
        match (&input.advance_type, input.owner) {
            (AdvanceType::LawyerAdvance, AdvanceOwner::Client(_)) => {
                return Err(BillingError::validation(
                    "lawyer_id",
                    "a lawyer advance must be deposited by a lawyer",
                ));
            }
            (t, AdvanceOwner::Lawyer(_)) if !t.is_lawyer_owned() => {
                return Err(BillingError::validation(
                    "client_id",
                    format!("a {t} must be deposited by a client"),
                ));
            }
            _ => {}
        }

        Ok(Self {
            id: AdvanceId::new(),
            tenant_id: input.tenant_id,
            owner: input.owner,
            matter_id: input.matter_id,
            advance_type: input.advance_type,
            amount: input.amount.amount,
            currency: input.amount.currency,
            date_received: input.date_received,
            balance_remaining: input.amount.amount,
            status: AdvanceStatus::Active,
        })
    }

    /// Rebuilds an advance from a stored row, rejecting rows that break the
    /// balance invariant.
    pub fn from_parts(parts: AdvanceParts) -> Result<Self, BillingError> {
        if parts.amount <= Decimal::ZERO
            || parts.balance_remaining < Decimal::ZERO
            || parts.balance_remaining > parts.amount
        {
            return Err(BillingError::Internal(format!(
                "advance {} has balance {} outside [0, {}]",
                parts.id, parts.balance_remaining, parts.amount
            )));
        }
        let consistent = match parts.status {
            AdvanceStatus::Active => parts.balance_remaining > Decimal::ZERO,
            AdvanceStatus::Depleted | AdvanceStatus::Refunded => parts.balance_remaining.is_zero(),
        };
        if !consistent {
            return Err(BillingError::Internal(format!(
                "advance {} is {} with balance {}",
                parts.id, parts.status, parts.balance_remaining
            )));
        }

        Ok(Self {
            id: parts.id,
            tenant_id: parts.tenant_id,
            owner: parts.owner,
            matter_id: parts.matter_id,
            advance_type: parts.advance_type,
            amount: parts.amount,
            currency: parts.currency,
            date_received: parts.date_received,
            balance_remaining: parts.balance_remaining,
            status: parts.status,
        })
    }

    /// Draws `amount` down from the balance and returns the new balance.
    ///
    /// There is no overdraft: asking for more than remains fails with
    /// `InsufficientBalance`. Reaching exactly zero marks the advance depleted.
    pub fn consume(&mut self, amount: Money) -> Result<Money, BillingError> {
        self.check_amount(amount)?;
        if amount.amount > self.balance_remaining {
            return Err(self.insufficient(amount.amount));
        }
        self.balance_remaining -= amount.amount;
        if self.balance_remaining.is_zero() {
            self.status = AdvanceStatus::Depleted;
        }
        Ok(self.balance())
    }

    /// Returns `amount` to the depositor and returns the new balance.
    ///
    /// The advance becomes refunded only when nothing is left; a partial
    /// refund leaves it active.
    pub fn refund(&mut self, amount: Money) -> Result<Money, BillingError> {
        self.check_amount(amount)?;
        if amount.amount > self.balance_remaining {
            return Err(self.insufficient(amount.amount));
        }
        self.balance_remaining -= amount.amount;
        if self.balance_remaining.is_zero() {
            self.status = AdvanceStatus::Refunded;
        }
        Ok(self.balance())
    }

    /// Puts back an amount previously consumed by an invoice that was voided.
    ///
    /// The balance can never exceed the original deposit. Any advance that
    /// gets balance back is active again.
    pub fn reinstate(&mut self, amount: Money) -> Result<Money, BillingError> {
        self.check_amount(amount)?;
        let restored = self.balance_remaining + amount.amount;
        if restored > self.amount {
            return Err(BillingError::validation(
                "amount",
                format!(
                    "reinstating {} would raise advance {} above its deposit of {}",
                    amount.amount, self.id, self.amount
                ),
            ));
        }
        self.balance_remaining = restored;
        self.status = AdvanceStatus::Active;
        Ok(self.balance())
    }

    fn check_amount(&self, amount: Money) -> Result<(), BillingError> {
        if !amount.is_positive() {
            return Err(BillingError::validation("amount", "must be greater than zero"));
        }
        Money::zero(self.currency).ensure_same_currency(amount.currency)?;
        BillingError::check_scale("amount", amount)
    }

    fn insufficient(&self, requested: Decimal) -> BillingError {
        BillingError::InsufficientBalance {
            advance_id: self.id.into_inner(),
            requested,
            available: self.balance_remaining,
        }
    }

    /// Advance id.
    #[must_use]
    pub fn id(&self) -> AdvanceId {
        self.id
    }

    /// Owning firm.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Depositor.
    #[must_use]
    pub fn owner(&self) -> AdvanceOwner {
        self.owner
    }

    /// Depositing client, absent for lawyer advances.
    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        self.owner.client_id()
    }

    /// Depositing lawyer, present only for lawyer advances.
    #[must_use]
    pub fn lawyer_id(&self) -> Option<LawyerId> {
        self.owner.lawyer_id()
    }

    /// Earmarked matter.
    #[must_use]
    pub fn matter_id(&self) -> Option<MatterId> {
        self.matter_id
    }

    /// Kind of deposit.
    #[must_use]
    pub fn advance_type(&self) -> &AdvanceType {
        &self.advance_type
    }

    /// Original deposit.
    #[must_use]
    pub fn amount(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    /// Currency of the deposit.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Day the money arrived.
    #[must_use]
    pub fn date_received(&self) -> NaiveDate {
        self.date_received
    }

    /// Unconsumed balance.
    #[must_use]
    pub fn balance(&self) -> Money {
        Money::new(self.balance_remaining, self.currency)
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> AdvanceStatus {
        self.status
    }
}

/// Sums the remaining balance of a client's advances of one type, per currency.
///
/// Only active and depleted advances count. Used for low-balance alerts, not
/// for invoice arithmetic.
#[must_use]
pub fn outstanding_balance(
    advances: &[Advance],
    client_id: ClientId,
    advance_type: &AdvanceType,
) -> CurrencyTotals {
    advances
        .iter()
        .filter(|a| a.client_id() == Some(client_id))
        .filter(|a| a.advance_type() == advance_type)
        .filter(|a| matches!(a.status(), AdvanceStatus::Active | AdvanceStatus::Depleted))
        .map(Advance::balance)
        .collect()
}
