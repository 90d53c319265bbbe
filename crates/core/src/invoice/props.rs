//! Property-based tests for invoice composition and voiding.
//!
//! - `total == taxable + vat` and `taxable == subtotal - discount - retainer`
//! - An entry is never billed twice by overlapping compositions
//! - Voiding hands back exactly what composing consumed

use chrono::NaiveDate;
use lexledger_shared::types::{ClientId, Currency, LawyerId, MatterId, Money, TenantId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::composer::InvoiceComposer;
use super::types::{
    ComposeInvoiceInput, ComposeSources, DiscountType, RetainerRequest, VoidKind,
};
use super::workflow::InvoiceWorkflow;
use crate::advance::{Advance, AdvanceOwner, AdvanceType, NewAdvance};
use crate::entries::{EntryStatus, NewTimeEntry, TimeEntry};
use crate::error::BillingError;

struct Scope {
    tenant_id: TenantId,
    client_id: ClientId,
    matter_id: MatterId,
}

fn scope() -> Scope {
    Scope {
        tenant_id: TenantId::new(),
        client_id: ClientId::new(),
        matter_id: MatterId::new(),
    }
}

/// Strategy for durations from 0.5 to 600 minutes in half-minute steps.
fn duration() -> impl Strategy<Value = Decimal> {
    (1i64..1200i64).prop_map(|halves| Decimal::new(halves * 5, 1))
}

/// Strategy for hourly rates from 50.00 to 800.00.
fn rate() -> impl Strategy<Value = Decimal> {
    (5_000i64..80_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn discount() -> impl Strategy<Value = (DiscountType, Decimal)> {
    prop_oneof![
        Just((DiscountType::None, Decimal::ZERO)),
        (0i64..=100i64).prop_map(|p| (DiscountType::Percent, Decimal::from(p))),
        (0i64..5_000i64).prop_map(|c| (DiscountType::Fixed, Decimal::new(c, 2))),
    ]
}

fn vat() -> impl Strategy<Value = Option<Decimal>> {
    prop_oneof![
        Just(None),
        (0i64..=25i64).prop_map(|p| Some(Decimal::new(p, 2))),
    ]
}

fn entry(scope: &Scope, day: u32, minutes: Decimal, rate: Decimal) -> TimeEntry {
    TimeEntry::capture(
        NewTimeEntry {
            tenant_id: scope.tenant_id,
            lawyer_id: LawyerId::new(),
            client_id: scope.client_id,
            matter_id: scope.matter_id,
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            duration_minutes: minutes,
            narrative: "Drafting".to_string(),
            billable: true,
            rate: None,
        },
        Money::new(rate, Currency::USD),
    )
    .unwrap()
}

fn retainer(scope: &Scope, amount: Decimal) -> Advance {
    Advance::deposit(NewAdvance {
        tenant_id: scope.tenant_id,
        owner: AdvanceOwner::Client(scope.client_id),
        matter_id: None,
        advance_type: AdvanceType::ClientRetainer,
        amount: Money::new(amount, Currency::USD),
        date_received: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
    })
    .unwrap()
}

fn input(scope: &Scope) -> ComposeInvoiceInput {
    ComposeInvoiceInput {
        tenant_id: scope.tenant_id,
        client_id: scope.client_id,
        matter_id: Some(scope.matter_id),
        time_entry_ids: None,
        expense_ids: None,
        manual_lines: vec![],
        currency: None,
        discount_type: DiscountType::None,
        discount_value: Decimal::ZERO,
        vat_rate: None,
        retainer: None,
        issue_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        due_date: None,
        period_start: None,
        period_end: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* composed invoice the totals reconcile exactly.
    #[test]
    fn prop_invoice_arithmetic_identities(
        lines in prop::collection::vec((duration(), rate()), 1..8),
        (discount_type, discount_value) in discount(),
        vat_rate in vat(),
        requested in (1i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
    ) {
        let scope = scope();
        let entries: Vec<_> = lines
            .iter()
            .enumerate()
            .map(|(i, (m, r))| entry(&scope, u32::try_from(i).unwrap() + 1, *m, *r))
            .collect();
        let advance = retainer(&scope, Decimal::new(1_000_000, 2));
        let mut request = input(&scope);
        request.discount_type = discount_type;
        request.discount_value = discount_value;
        request.vat_rate = vat_rate;
        request.retainer = Some(RetainerRequest { advance_id: advance.id(), amount: requested });

        let result = InvoiceComposer::default().compose(
            &request,
            ComposeSources { time_entries: entries, expenses: vec![], advance: Some(advance) },
        );
        match result {
            Ok(composed) => {
                let inv = composed.invoice;
                prop_assert_eq!(inv.total, inv.taxable_amount + inv.vat_amount);
                prop_assert_eq!(
                    inv.taxable_amount,
                    inv.subtotal - inv.discount_amount - inv.retainer_applied
                );
                prop_assert!(inv.retainer_applied <= inv.subtotal - inv.discount_amount);
                prop_assert!(inv.retainer_applied <= requested);
                prop_assert!(inv.taxable_amount >= Decimal::ZERO);
                let line_sum: Decimal = composed.line_items.iter().map(|l| l.amount).sum();
                prop_assert_eq!(inv.subtotal, line_sum);
                for line in &composed.line_items {
                    prop_assert_eq!(line.amount, line.amount.round_dp(2));
                }
            }
            // a fixed discount can exceed a small subtotal
            Err(err) => prop_assert_eq!(err.field(), "discount_value"),
        }
    }

    /// *For any* two compositions over overlapping entry sets, no entry ends
    /// up on both invoices.
    #[test]
    fn prop_overlapping_compositions_never_double_bill(
        count in 2usize..8,
        split in 0usize..8,
        overlap in 1usize..4,
    ) {
        let scope = scope();
        let entries: Vec<_> = (0..count)
            .map(|i| entry(&scope, u32::try_from(i).unwrap() + 1, Decimal::from(30), Decimal::from(200)))
            .collect();
        let split = split.min(count - 1);
        let first_ids: Vec<_> = entries[..=split].iter().map(|e| e.id).collect();
        let second_start = (split + 1).saturating_sub(overlap);
        let second_ids: Vec<_> = entries[second_start..].iter().map(|e| e.id).collect();

        let mut first = input(&scope);
        first.time_entry_ids = Some(first_ids);
        let composed = InvoiceComposer::default()
            .compose(&first, ComposeSources { time_entries: entries.clone(), ..ComposeSources::default() })
            .unwrap();

        // what the store holds after the first commit
        let stored: Vec<_> = entries
            .into_iter()
            .map(|e| composed.time_entries.iter().find(|c| c.id == e.id).cloned().unwrap_or(e))
            .collect();

        let mut second = input(&scope);
        second.time_entry_ids = Some(second_ids);
        let explicit = InvoiceComposer::default()
            .compose(&second, ComposeSources { time_entries: stored.clone(), ..ComposeSources::default() });
        let is_already_invoiced = matches!(explicit, Err(BillingError::AlreadyInvoiced { .. }));
        prop_assert!(is_already_invoiced);

        // without an explicit list the second pass only sees what is left
        match InvoiceComposer::default()
            .compose(&input(&scope), ComposeSources { time_entries: stored, ..ComposeSources::default() })
        {
            Ok(rest) => {
                for e in &rest.time_entries {
                    prop_assert!(!composed.time_entries.iter().any(|c| c.id == e.id));
                }
            }
            Err(err) => prop_assert_eq!(err.error_code(), "VALIDATION_ERROR"),
        }
    }

    /// *For any* composition that is then voided, every entry is back in
    /// draft and the advance holds its pre-compose balance.
    #[test]
    fn prop_void_is_inverse_of_compose(
        lines in prop::collection::vec((duration(), rate()), 1..6),
        deposit in (1i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        requested in (1i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
    ) {
        prop_assume!(requested <= deposit);
        let scope = scope();
        let entries: Vec<_> = lines
            .iter()
            .enumerate()
            .map(|(i, (m, r))| entry(&scope, u32::try_from(i).unwrap() + 1, *m, *r))
            .collect();
        let advance = retainer(&scope, deposit);
        let before = advance.clone();
        let mut request = input(&scope);
        request.retainer = Some(RetainerRequest { advance_id: advance.id(), amount: requested });

        let composed = InvoiceComposer::default()
            .compose(&request, ComposeSources { time_entries: entries.clone(), expenses: vec![], advance: Some(advance) })
            .unwrap();

        let mut invoice = composed.invoice;
        let reversal = InvoiceWorkflow::void(
            &mut invoice,
            &composed.line_items,
            VoidKind::Cancelled,
            "entered in error",
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            false,
        )
        .unwrap();

        let mut released = composed.time_entries;
        for e in &mut released {
            prop_assert!(reversal.time_entry_ids.contains(&e.id));
            e.release(invoice.id).unwrap();
        }
        for (original, restored) in entries.iter().zip(&released) {
            prop_assert_eq!(original, restored);
            prop_assert_eq!(restored.status(), EntryStatus::Draft);
        }

        let mut after = composed.advance.unwrap_or_else(|| before.clone());
        if let Some((_, amount)) = reversal.retainer {
            after.reinstate(amount).unwrap();
        }
        prop_assert_eq!(after.balance(), before.balance());
        prop_assert_eq!(after.status(), before.status());
    }
}
