//! Property-based tests for the advance aggregate.
//!
//! - Balance stays within `[0, amount]` after any sequence of operations
//! - Failed operations leave the advance unchanged
//! - Depleted exactly when the balance reaches zero through consumption

use chrono::NaiveDate;
use lexledger_shared::types::{ClientId, Currency, Money, TenantId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::ledger::Advance;
use super::types::{AdvanceOwner, AdvanceStatus, AdvanceType, NewAdvance};

#[derive(Debug, Clone)]
enum Op {
    Consume(Decimal),
    Refund(Decimal),
    Reinstate(Decimal),
}

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => positive_amount().prop_map(Op::Consume),
        1 => positive_amount().prop_map(Op::Refund),
        1 => positive_amount().prop_map(Op::Reinstate),
    ]
}

fn deposit(amount: Decimal) -> Advance {
    Advance::deposit(NewAdvance {
        tenant_id: TenantId::new(),
        owner: AdvanceOwner::Client(ClientId::new()),
        matter_id: None,
        advance_type: AdvanceType::ClientRetainer,
        amount: Money::new(amount, Currency::USD),
        date_received: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
    })
    .unwrap()
}

fn apply(advance: &mut Advance, op: &Op) -> bool {
    let result = match op {
        Op::Consume(a) => advance.consume(Money::new(*a, Currency::USD)),
        Op::Refund(a) => advance.refund(Money::new(*a, Currency::USD)),
        Op::Reinstate(a) => advance.reinstate(Money::new(*a, Currency::USD)),
    };
    result.is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* sequence of operations the balance stays in `[0, amount]`.
    #[test]
    fn prop_balance_stays_in_bounds(
        amount in positive_amount(),
        ops in prop::collection::vec(op_strategy(), 0..30),
    ) {
        let mut advance = deposit(amount);
        for op in &ops {
            apply(&mut advance, op);
            let balance = advance.balance().amount;
            prop_assert!(balance >= Decimal::ZERO);
            prop_assert!(balance <= advance.amount().amount);
        }
    }

    /// *For any* failed operation, the advance is unchanged.
    #[test]
    fn prop_failed_operation_is_noop(
        amount in positive_amount(),
        ops in prop::collection::vec(op_strategy(), 1..30),
    ) {
        let mut advance = deposit(amount);
        for op in &ops {
            let before = advance.clone();
            if !apply(&mut advance, op) {
                prop_assert_eq!(&advance, &before);
            }
        }
    }

    /// *For any* consumption, the advance is depleted iff the balance is zero.
    #[test]
    fn prop_depleted_iff_zero(
        amount in positive_amount(),
        draws in prop::collection::vec(positive_amount(), 1..20),
    ) {
        let mut advance = deposit(amount);
        for draw in draws {
            let _ = advance.consume(Money::new(draw, Currency::USD));
            let zero = advance.balance().is_zero();
            prop_assert_eq!(advance.status() == AdvanceStatus::Depleted, zero);
        }
    }

    /// *For any* consume followed by reinstate of the same amount, the
    /// balance returns to where it started.
    #[test]
    fn prop_reinstate_inverts_consume(
        amount in positive_amount(),
        draw in positive_amount(),
    ) {
        let mut advance = deposit(amount);
        prop_assume!(draw <= amount);
        let before = advance.balance();
        advance.consume(Money::new(draw, Currency::USD)).unwrap();
        advance.reinstate(Money::new(draw, Currency::USD)).unwrap();
        prop_assert_eq!(advance.balance(), before);
        prop_assert_eq!(advance.status(), AdvanceStatus::Active);
    }
}
