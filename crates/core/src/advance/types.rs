//! Advance domain types.

use chrono::NaiveDate;
use lexledger_shared::types::{ClientId, Currency, LawyerId, MatterId, Money, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BillingError;

const FEE_PAYMENT_PREFIX: &str = "fee_payment_";

/// Kind of deposit an advance represents.
///
/// Stored as text; fee payments carry the channel they arrived through as a
/// suffix (`fee_payment_bank`, `fee_payment_cash`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AdvanceType {
    /// Client prepayment held against future invoices.
    ClientRetainer,
    /// Client money held to cover disbursements.
    ClientExpenseAdvance,
    /// Money advanced to a lawyer, to be reimbursed.
    LawyerAdvance,
    /// Fee paid directly, tagged with the payment channel.
    FeePayment(String),
}

impl AdvanceType {
    /// Returns true for the types that can be drawn down on an invoice.
    #[must_use]
    pub fn is_client_funds(&self) -> bool {
        matches!(self, Self::ClientRetainer | Self::ClientExpenseAdvance)
    }

    /// Returns true if the advance belongs to a lawyer rather than a client.
    #[must_use]
    pub fn is_lawyer_owned(&self) -> bool {
        matches!(self, Self::LawyerAdvance)
    }
}

impl fmt::Display for AdvanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientRetainer => f.write_str("client_retainer"),
            Self::ClientExpenseAdvance => f.write_str("client_expense_advance"),
            Self::LawyerAdvance => f.write_str("lawyer_advance"),
            Self::FeePayment(channel) => write!(f, "{FEE_PAYMENT_PREFIX}{channel}"),
        }
    }
}

impl FromStr for AdvanceType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "client_retainer" => Ok(Self::ClientRetainer),
            "client_expense_advance" => Ok(Self::ClientExpenseAdvance),
            "lawyer_advance" => Ok(Self::LawyerAdvance),
            other => match other.strip_prefix(FEE_PAYMENT_PREFIX) {
                Some(channel)
                    if !channel.is_empty()
                        && channel
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
                {
                    Ok(Self::FeePayment(channel.to_string()))
                }
                _ => Err(BillingError::validation(
                    "advance_type",
                    format!("unknown advance type '{s}'"),
                )),
            },
        }
    }
}

impl TryFrom<String> for AdvanceType {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdvanceType> for String {
    fn from(value: AdvanceType) -> Self {
        value.to_string()
    }
}

/// Lifecycle status of an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceStatus {
    /// Balance remains.
    Active,
    /// Fully consumed by invoices.
    Depleted,
    /// Remaining balance returned to the depositor.
    Refunded,
}

impl AdvanceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Depleted => "depleted",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "depleted" => Some(Self::Depleted),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who deposited the advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AdvanceOwner {
    /// A client of the firm.
    Client(ClientId),
    /// A lawyer of the firm.
    Lawyer(LawyerId),
}

impl AdvanceOwner {
    /// The client id, if the owner is a client.
    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            Self::Client(id) => Some(*id),
            Self::Lawyer(_) => None,
        }
    }

    /// The lawyer id, if the owner is a lawyer.
    #[must_use]
    pub fn lawyer_id(&self) -> Option<LawyerId> {
        match self {
            Self::Lawyer(id) => Some(*id),
            Self::Client(_) => None,
        }
    }
}

/// Input for a deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdvance {
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Depositor.
    pub owner: AdvanceOwner,
    /// Matter the deposit is earmarked for.
    pub matter_id: Option<MatterId>,
    /// Kind of deposit.
    pub advance_type: AdvanceType,
    /// Amount deposited.
    pub amount: Money,
    /// Day the money arrived.
    pub date_received: NaiveDate,
}

/// A stored advance row, as read back from persistence.
#[derive(Debug, Clone)]
pub struct AdvanceParts {
    /// Advance id.
    pub id: lexledger_shared::types::AdvanceId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Depositor.
    pub owner: AdvanceOwner,
    /// Earmarked matter.
    pub matter_id: Option<MatterId>,
    /// Kind of deposit.
    pub advance_type: AdvanceType,
    /// Original deposit.
    pub amount: Decimal,
    /// Currency of the deposit.
    pub currency: Currency,
    /// Day the money arrived.
    pub date_received: NaiveDate,
    /// Unconsumed balance.
    pub balance_remaining: Decimal,
    /// Lifecycle status.
    pub status: AdvanceStatus,
}
