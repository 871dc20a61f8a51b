//! Currency registry, rate table, and period-end revaluation.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use tessera_shared::{money, LedgerConfig, Period};

use crate::error::{LedgerError, LedgerResult};
use crate::fx::types::{Currency, ExchangeRate, RateType, RevaluationLine, RevaluationResult};
use crate::state::LedgerState;
use crate::voucher::{EntryDraft, VoucherDraft, VoucherStore};

/// Stateless multi-currency service.
pub struct FxService;

impl FxService {
    /// Registers or updates a currency.
    pub fn add_currency(
        state: &mut LedgerState,
        code: &str,
        name: &str,
        symbol: Option<String>,
        precision: u32,
    ) {
        state.currencies.insert(
            code.to_string(),
            Currency {
                code: code.to_string(),
                name: name.to_string(),
                symbol,
                precision,
                is_active: true,
            },
        );
    }

    /// Records a rate observation, replacing any prior observation with the
    /// same (currency, date, type) key. Rates are rounded to six places.
    ///
    /// # Errors
    ///
    /// `CURRENCY_NOT_FOUND` when the currency is not registered.
    pub fn add_rate(
        state: &mut LedgerState,
        currency: &str,
        date: NaiveDate,
        rate: Decimal,
        rate_type: RateType,
        source: Option<String>,
    ) -> LedgerResult<()> {
        if !state.currencies.contains_key(currency) {
            return Err(LedgerError::CurrencyNotFound(currency.to_string()));
        }
        let rate = money::round_rate(rate);
        state
            .exchange_rates
            .retain(|r| !(r.currency == currency && r.date == date && r.rate_type == rate_type));
        state.exchange_rates.push(ExchangeRate {
            currency: currency.to_string(),
            date,
            rate,
            rate_type,
            source,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Looks up the rate effective on a date: the observation on the date
    /// itself, or the nearest prior date within the same rate type.
    ///
    /// # Errors
    ///
    /// `RATE_NOT_FOUND` when no observation exists on or before the date.
    pub fn lookup_rate(
        state: &LedgerState,
        currency: &str,
        date: NaiveDate,
        rate_type: RateType,
    ) -> LedgerResult<Decimal> {
        state
            .exchange_rates
            .iter()
            .filter(|r| r.currency == currency && r.rate_type == rate_type && r.date <= date)
            .max_by_key(|r| r.date)
            .map(|r| r.rate)
            .ok_or(LedgerError::RateNotFound {
                currency: currency.to_string(),
                date,
                rate_type,
            })
    }

    /// Period-end revaluation.
    ///
    /// For every revaluable account with foreign balances, computes
    /// `delta = foreign_closing x period_end_rate - functional_closing`
    /// per currency and posts one gain/loss voucher per account against the
    /// configured exchange gain/loss account. Foreign balances are left
    /// untouched. The whole batch commits atomically under the facade.
    ///
    /// # Errors
    ///
    /// `RATE_NOT_FOUND` when a needed closing rate is missing; any voucher
    /// admission error aborts the batch.
    pub fn revalue(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
        rate_type: RateType,
    ) -> LedgerResult<RevaluationResult> {
        let rate_date = period.last_day();
        let gain_loss_account = config.fx.gain_loss_account.clone();
        let mut lines = Vec::new();

        // Carried-forward view: accounts not touched this period still
        // revalue against their standing balances.
        let rows = crate::balance::BalanceEngine::effective_rows(state, period);

        // (account, currency, foreign_closing, functional_closing)
        let mut targets: Vec<(String, String, Decimal, Decimal)> = Vec::new();
        for account_code in &config.fx.revaluable_accounts {
            let mut foreign_closing = Decimal::ZERO;
            let mut functional_closing = Decimal::ZERO;
            let mut currency: Option<String> = None;
            for row in rows.iter().filter(|b| &b.account_code == account_code) {
                if let Some(row_currency) = &row.currency {
                    currency = Some(row_currency.clone());
                    foreign_closing += row.foreign_closing;
                    functional_closing += row.closing;
                }
            }
            if let Some(currency) = currency {
                targets.push((
                    account_code.clone(),
                    currency,
                    foreign_closing,
                    functional_closing,
                ));
            }
        }

        for (account_code, currency, foreign_closing, functional_closing) in targets {
            let rate = Self::lookup_rate(state, &currency, rate_date, rate_type)?;
            let revalued = money::round_money(foreign_closing * rate);
            let account = state.account_any(&account_code)?;
            let direction = account.direction;
            let delta = revalued - functional_closing;
            if delta.abs() < money::tolerance() {
                continue;
            }

            // A debit-natured balance grows on the debit side; a gain on a
            // credit-natured balance grows on the credit side.
            let (account_debit, account_credit, gain) = match direction {
                crate::chart::Direction::Debit => {
                    if delta > Decimal::ZERO {
                        (delta, Decimal::ZERO, true)
                    } else {
                        (Decimal::ZERO, -delta, false)
                    }
                }
                crate::chart::Direction::Credit => {
                    if delta > Decimal::ZERO {
                        (Decimal::ZERO, delta, false)
                    } else {
                        (-delta, Decimal::ZERO, true)
                    }
                }
            };
            let amount = delta.abs();

            let draft = VoucherDraft {
                date: rate_date,
                description: Some(format!(
                    "Revaluation {period} {currency} {account_code} at {rate}"
                )),
                entry_type: Default::default(),
                source_event_id: None,
                entries: vec![
                    EntryDraft {
                        account: account_code.clone(),
                        description: Some(format!("Revaluation at {rate}")),
                        debit: account_debit,
                        credit: account_credit,
                        ..Default::default()
                    },
                    EntryDraft {
                        account: gain_loss_account.clone(),
                        description: Some(if gain {
                            "Exchange gain".to_string()
                        } else {
                            "Exchange loss".to_string()
                        }),
                        debit: if gain { Decimal::ZERO } else { amount },
                        credit: if gain { amount } else { Decimal::ZERO },
                        ..Default::default()
                    },
                ],
            };
            let outcome = VoucherStore::submit(state, &draft, true)?;

            lines.push(RevaluationLine {
                account_code,
                currency,
                foreign_closing,
                rate,
                functional_before: functional_closing,
                delta,
                voucher_id: outcome.voucher_id,
            });
        }

        info!(period = %period, accounts = lines.len(), "revaluation complete");
        Ok(RevaluationResult {
            period,
            rate_type,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn state_with_usd() -> LedgerState {
        let mut state = LedgerState::seeded();
        FxService::add_currency(&mut state, "USD", "US Dollar", Some("$".into()), 2);
        state
    }

    #[test]
    fn test_rate_lookup_exact_date() {
        let mut state = state_with_usd();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        FxService::add_rate(&mut state, "USD", date, dec!(7.0), RateType::Spot, None).unwrap();
        assert_eq!(
            FxService::lookup_rate(&state, "USD", date, RateType::Spot).unwrap(),
            dec!(7.0)
        );
    }

    #[test]
    fn test_rate_lookup_nearest_prior() {
        let mut state = state_with_usd();
        let jan10 = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let jan20 = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        FxService::add_rate(&mut state, "USD", jan10, dec!(7.0), RateType::Spot, None).unwrap();
        FxService::add_rate(&mut state, "USD", jan20, dec!(7.2), RateType::Spot, None).unwrap();

        let jan15 = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(
            FxService::lookup_rate(&state, "USD", jan15, RateType::Spot).unwrap(),
            dec!(7.0)
        );
        let jan25 = NaiveDate::from_ymd_opt(2025, 1, 25).unwrap();
        assert_eq!(
            FxService::lookup_rate(&state, "USD", jan25, RateType::Spot).unwrap(),
            dec!(7.2)
        );
    }

    #[test]
    fn test_rate_lookup_scoped_to_rate_type() {
        let mut state = state_with_usd();
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        FxService::add_rate(&mut state, "USD", date, dec!(7.2), RateType::Closing, None).unwrap();
        assert!(matches!(
            FxService::lookup_rate(&state, "USD", date, RateType::Spot),
            Err(LedgerError::RateNotFound { .. })
        ));
    }

    #[test]
    fn test_rate_requires_registered_currency() {
        let mut state = LedgerState::seeded();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(matches!(
            FxService::add_rate(&mut state, "USD", date, dec!(7.0), RateType::Spot, None),
            Err(LedgerError::CurrencyNotFound(_))
        ));
    }

    #[test]
    fn test_rate_rounded_to_six_places() {
        let mut state = state_with_usd();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        FxService::add_rate(
            &mut state,
            "USD",
            date,
            dec!(7.12345678),
            RateType::Spot,
            None,
        )
        .unwrap();
        assert_eq!(
            FxService::lookup_rate(&state, "USD", date, RateType::Spot).unwrap(),
            dec!(7.123457)
        );
    }
}
