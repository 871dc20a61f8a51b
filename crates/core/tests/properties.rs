//! Property tests for the ledger's universal invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tessera_core::balance::BalanceKey;
use tessera_core::chart::AccountType;
use tessera_core::model::{CalcOptions, DriverRecord, ModelEngine};
use tessera_core::subledger::OpenItemSide;
use tessera_core::template::{ClosingRule, SourceSelector};
use tessera_core::voucher::{EntryDraft, VoucherDraft};
use tessera_core::{Ledger, LedgerError};
use tessera_shared::{LedgerConfig, Period};

/// Accounts safe for random postings: every pair keeps the default
/// statement mapping's identities intact.
const POSTING_ACCOUNTS: [&str; 12] = [
    "1001", "1002", "1122", "1403", "1601", "2001", "2202", "4001", "6001", "6401", "6601",
    "6602",
];

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|n| Decimal::new(n, 2))
}

fn posting_strategy() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (
        0..POSTING_ACCOUNTS.len(),
        0..POSTING_ACCOUNTS.len(),
        amount_strategy(),
    )
}

fn postings_strategy(max: usize) -> impl Strategy<Value = Vec<(usize, usize, Decimal)>> {
    prop::collection::vec(posting_strategy(), 1..=max)
}

fn draft(date: &str, debit: &str, credit: &str, amount: Decimal) -> VoucherDraft {
    VoucherDraft {
        date: date.parse().unwrap(),
        description: None,
        entry_type: Default::default(),
        source_event_id: None,
        entries: vec![
            EntryDraft {
                account: debit.into(),
                debit: amount,
                ..Default::default()
            },
            EntryDraft {
                account: credit.into(),
                credit: amount,
                ..Default::default()
            },
        ],
    }
}

fn apply_postings(ledger: &mut Ledger, date: &str, postings: &[(usize, usize, Decimal)]) {
    for (debit, credit, amount) in postings {
        ledger
            .submit(
                &draft(
                    date,
                    POSTING_ACCOUNTS[*debit],
                    POSTING_ACCOUNTS[*credit],
                    *amount,
                ),
                true,
            )
            .unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every persisted voucher balances within tolerance, and an
    /// unbalanced request never lands.
    #[test]
    fn prop_persisted_vouchers_balance(postings in postings_strategy(8)) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        apply_postings(&mut ledger, "2025-01-15", &postings);

        for voucher in ledger.state().vouchers.values() {
            let totals = voucher.totals();
            prop_assert!((totals.debit_total - totals.credit_total).abs() <= dec!(0.01));
        }

        let mut bad = draft("2025-01-15", "1001", "1002", dec!(100));
        bad.entries[1].credit = dec!(50);
        let is_not_balanced_err = matches!(
            ledger.submit(&bad, true),
            Err(LedgerError::NotBalanced { .. })
        );
        prop_assert!(is_not_balanced_err);
    }

    /// Replaying all posted vouchers reproduces the balance index exactly,
    /// including after voids.
    #[test]
    fn prop_replay_equals_state(
        postings in postings_strategy(8),
        void_mask in prop::collection::vec(any::<bool>(), 8),
    ) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        apply_postings(&mut ledger, "2025-01-15", &postings);

        let ids: Vec<i64> = ledger.state().vouchers.keys().copied().collect();
        for (id, void) in ids.iter().zip(void_mask.iter()) {
            if *void {
                ledger.void(*id, "property test").unwrap();
            }
        }

        prop_assert!(ledger.verify_balances().is_ok());
    }

    /// The statements of a random ledger always satisfy the accounting
    /// identity and the cash reconciliation.
    #[test]
    fn prop_statement_identities_hold(
        january in postings_strategy(6),
        february in postings_strategy(6),
    ) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        apply_postings(&mut ledger, "2025-01-15", &january);
        apply_postings(&mut ledger, "2025-02-15", &february);

        for period in ["2025-01", "2025-02"] {
            let report = ledger.statements(period.parse().unwrap(), None).unwrap();
            prop_assert!(report.validation.is_balanced);
            prop_assert!(report.validation.cash_reconciled);
            prop_assert!(report.validation.balance_diff.abs() <= dec!(0.01));
            prop_assert!(report.validation.cash_diff.abs() <= dec!(0.01));
        }
    }

    /// After closing, every balance key opens the next period with the
    /// prior closing balance.
    #[test]
    fn prop_rollover_continuity(postings in postings_strategy(8)) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        apply_postings(&mut ledger, "2025-01-15", &postings);

        let period: Period = "2025-01".parse().unwrap();
        ledger.close_period(period).unwrap();

        let rows: Vec<_> = ledger
            .state()
            .balances_for_period(period)
            .map(|b| (b.key(), b.closing))
            .collect();
        prop_assert!(!rows.is_empty());
        for (key, closing) in rows {
            let next = ledger
                .state()
                .balance(&key.in_period(period.next()))
                .expect("rollover materializes every key");
            prop_assert_eq!(next.opening, closing);
        }
    }

    /// A voucher and its red-letter reversal sum to the zero vector of
    /// balance effects.
    #[test]
    fn prop_void_symmetry(postings in postings_strategy(6)) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        apply_postings(&mut ledger, "2025-01-15", &postings);

        let ids: Vec<i64> = ledger.state().vouchers.keys().copied().collect();
        for id in ids {
            ledger.void(id, "symmetry").unwrap();
        }

        for row in &ledger.state().balances {
            prop_assert_eq!(row.closing, Decimal::ZERO);
            prop_assert_eq!(row.opening, Decimal::ZERO);
        }
    }

    /// Resubmitting the same source event returns the original voucher
    /// and leaves the ledger untouched.
    #[test]
    fn prop_idempotent_resubmission(amount in amount_strategy()) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        let mut request = draft("2025-01-15", "1001", "6001", amount);
        request.source_event_id = Some("evt-prop".into());

        let first = ledger.submit(&request, true).unwrap();
        let voucher_count = ledger.state().vouchers.len();
        let closing_before = ledger
            .state()
            .balance(&BalanceKey {
                account_code: "1001".into(),
                period: "2025-01".parse().unwrap(),
                dims: Default::default(),
            })
            .unwrap()
            .closing;

        let second = ledger.submit(&request, true).unwrap();
        prop_assert_eq!(first.voucher_id, second.voucher_id);
        prop_assert!(second.existing);
        prop_assert_eq!(ledger.state().vouchers.len(), voucher_count);
        let closing_after = ledger
            .state()
            .balance(&BalanceKey {
                account_code: "1001".into(),
                period: "2025-01".parse().unwrap(),
                dims: Default::default(),
            })
            .unwrap()
            .closing;
        prop_assert_eq!(closing_before, closing_after);
    }

    /// An accepted closing template always produces a balanced voucher.
    #[test]
    fn prop_closing_template_balances(postings in postings_strategy(8)) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger
            .add_closing_template(
                "pl_close",
                "Close profit and loss",
                ClosingRule {
                    sources: vec![SourceSelector {
                        prefixes: vec![],
                        account_types: vec![AccountType::Revenue, AccountType::Expense],
                    }],
                    target_account: "4103".into(),
                    description: "Close {period}".into(),
                },
            )
            .unwrap();
        apply_postings(&mut ledger, "2025-01-15", &postings);

        let outcome = ledger.close_period("2025-01".parse().unwrap()).unwrap();
        for (_, voucher_id) in &outcome.closing_vouchers {
            let totals = ledger.state().voucher(*voucher_id).unwrap().totals();
            prop_assert!(totals.is_balanced);
        }
        prop_assert!(ledger.verify_balances().is_ok());
    }

    /// With a sane interest rate the borrowing iteration is a contraction:
    /// the loop reaches its fixed point inside a modest budget.
    #[test]
    fn prop_iteration_converges_for_contractive_rates(
        revenue in 0i64..100_000,
        cost in 0i64..100_000,
        opening_cash in 0i64..50_000,
        opening_debt in 0i64..50_000,
        min_cash in 0i64..50_000,
        rate_bp in 0i64..3000, // up to 30%
    ) {
        let driver = DriverRecord {
            revenue: Decimal::from(revenue),
            cost: Decimal::from(cost),
            opening_cash: Decimal::from(opening_cash),
            opening_debt: Decimal::from(opening_debt),
            min_cash: Decimal::from(min_cash),
            interest_rate: Decimal::new(rate_bp, 4),
            tax_rate: dec!(0.25),
            ..DriverRecord::default()
        };
        let output = ModelEngine::calc(&driver, &CalcOptions::with_iterations(24));
        prop_assert_eq!(output.iteration_converged, Some(true));
        prop_assert!(output.is_balanced);
    }

    /// Aging buckets partition the receivable control balance: their sum
    /// equals the control account's closing balance.
    #[test]
    fn prop_aging_sums_to_control_balance(
        amounts in prop::collection::vec(amount_strategy(), 1..6),
    ) {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger
            .add_dimension(tessera_core::dimension::DimensionType::Customer, "C1", "Customer")
            .unwrap();

        for (index, amount) in amounts.iter().enumerate() {
            let day = (index % 27) + 1;
            let date = format!("2025-01-{day:02}").parse().unwrap();
            ledger
                .add_open_item(OpenItemSide::Receivable, "C1", *amount, date, None)
                .unwrap();
        }

        let period: Period = "2025-01".parse().unwrap();
        let report = ledger.aging(OpenItemSide::Receivable, period.last_day(), None);
        let control: Decimal = ledger
            .state()
            .balances_for_period(period)
            .filter(|b| b.account_code == "1122")
            .map(|b| b.closing)
            .sum();
        prop_assert_eq!(report.total, control);
    }
}
