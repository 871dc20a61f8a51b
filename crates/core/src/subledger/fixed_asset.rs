//! Fixed assets and construction in progress.
//!
//! Per-asset cards carry cost, salvage, life, and depreciation method.
//! Monthly depreciation, impairment, impairment reversal, and CIP
//! transfers each post a balanced voucher; depreciation is idempotent per
//! asset and period.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_shared::{money, LedgerConfig, Period};

use crate::dimension::DimensionRefs;
use crate::error::{LedgerError, LedgerResult};
use crate::state::LedgerState;
use crate::voucher::{EntryDraft, VoucherDraft, VoucherStore};

/// Depreciation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    /// Equal charge over the useful life.
    #[default]
    StraightLine,
    /// Twice the straight-line rate on the declining book value.
    DoubleDeclining,
    /// Remaining-years fraction of the depreciable base.
    SumOfYears,
}

/// A fixed-asset card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedAsset {
    /// Asset id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Original cost.
    pub cost: Decimal,
    /// Salvage value.
    pub salvage: Decimal,
    /// Useful life in years.
    pub life_years: u32,
    /// Depreciation method.
    #[serde(default)]
    pub method: DepreciationMethod,
    /// Acquisition date.
    pub acquired_at: NaiveDate,
    /// Depreciation accumulated so far.
    pub accumulated: Decimal,
    /// Impairment recognized so far (net of reversals).
    pub impairment: Decimal,
    /// Dimensions carried on the asset's postings.
    #[serde(default)]
    pub dims: DimensionRefs,
    /// Set when the asset has been disposed of.
    #[serde(default)]
    pub disposed_at: Option<NaiveDate>,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

impl FixedAsset {
    /// Net book value: cost minus accumulated depreciation and impairment.
    #[must_use]
    pub fn net_value(&self) -> Decimal {
        self.cost - self.accumulated - self.impairment
    }

    /// The depreciable base remaining above salvage.
    #[must_use]
    pub fn depreciable_remaining(&self) -> Decimal {
        (self.cost - self.impairment - self.salvage - self.accumulated).max(Decimal::ZERO)
    }
}

/// One month of depreciation for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationRecord {
    /// Record id.
    pub id: i64,
    /// The asset.
    pub asset_id: i64,
    /// The depreciated period.
    pub period: Period,
    /// Amount charged.
    pub amount: Decimal,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// An impairment (positive) or impairment reversal (negative).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpairmentRecord {
    /// Record id.
    pub id: i64,
    /// The asset.
    pub asset_id: i64,
    /// The period recognized.
    pub period: Period,
    /// Signed amount.
    pub amount: Decimal,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// CIP project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipStatus {
    /// Still accumulating cost.
    Ongoing,
    /// Fully transferred to fixed assets.
    Transferred,
}

/// A construction-in-progress project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipProject {
    /// Project id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Cost accumulated.
    pub cost: Decimal,
    /// Cost transferred out so far.
    pub transferred: Decimal,
    /// Status.
    pub status: CipStatus,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

impl CipProject {
    /// Cost not yet transferred.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.cost - self.transferred
    }
}

/// One CIP-to-asset transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipTransfer {
    /// Transfer id.
    pub id: i64,
    /// The source project.
    pub project_id: i64,
    /// The receiving asset.
    pub asset_id: i64,
    /// Amount transferred.
    pub amount: Decimal,
    /// Transfer date.
    pub date: NaiveDate,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// Outcome of an asset disposal.
#[derive(Debug, Clone, Serialize)]
pub struct DisposalOutcome {
    /// The disposed asset.
    pub asset_id: i64,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Net book value written off.
    pub net_value: Decimal,
    /// Cash received.
    pub proceeds: Decimal,
    /// Proceeds minus net book value.
    pub gain: Decimal,
}

/// Outcome of a depreciation run.
#[derive(Debug, Clone, Serialize)]
pub struct DepreciationOutcome {
    /// The depreciated period.
    pub period: Period,
    /// Per-asset charges, as (asset id, amount, voucher id).
    pub charges: Vec<(i64, Decimal, i64)>,
    /// Total charged.
    pub total: Decimal,
}

/// Stateless fixed-asset service.
pub struct AssetService;

impl AssetService {
    /// Registers an asset and posts its acquisition against bank.
    ///
    /// # Errors
    ///
    /// Voucher admission errors propagate.
    #[allow(clippy::too_many_arguments)]
    pub fn add_asset(
        state: &mut LedgerState,
        config: &LedgerConfig,
        name: &str,
        cost: Decimal,
        salvage: Decimal,
        life_years: u32,
        method: DepreciationMethod,
        acquired_at: NaiveDate,
    ) -> LedgerResult<i64> {
        let cost = money::round_money(cost);
        let draft = VoucherDraft {
            date: acquired_at,
            description: Some(format!("Acquisition of {name}")),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.fixed_asset.clone(),
                    debit: cost,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.bank.clone(),
                    credit: cost,
                    ..Default::default()
                },
            ],
        };
        VoucherStore::submit(state, &draft, true)?;

        state.counters.fixed_asset += 1;
        let id = state.counters.fixed_asset;
        state.fixed_assets.insert(
            id,
            FixedAsset {
                id,
                name: name.to_string(),
                cost,
                salvage: money::round_money(salvage),
                life_years,
                method,
                acquired_at,
                accumulated: Decimal::ZERO,
                impairment: Decimal::ZERO,
                dims: DimensionRefs::NONE,
                disposed_at: None,
                created_at: Utc::now(),
            },
        );
        info!(asset_id = id, %cost, "fixed asset registered");
        Ok(id)
    }

    /// Monthly depreciation charge for an asset in a period.
    ///
    /// One twelfth of the annual charge, capped so book value never falls
    /// below salvage (plus recognized impairment). Zero when the life is
    /// zero or the base is exhausted.
    #[must_use]
    pub fn monthly_charge(asset: &FixedAsset, period: Period) -> Decimal {
        if asset.life_years == 0 {
            return Decimal::ZERO;
        }
        let life = Decimal::from(asset.life_years);
        let base = asset.cost - asset.impairment - asset.salvage;
        let annual = match asset.method {
            DepreciationMethod::StraightLine => base / life,
            DepreciationMethod::DoubleDeclining => {
                let rate = Decimal::TWO / life;
                (asset.cost - asset.impairment - asset.accumulated) * rate
            }
            DepreciationMethod::SumOfYears => {
                let years_elapsed = (period.year() - asset.acquired_at.year()).max(0) as u32;
                let remaining = asset.life_years.saturating_sub(years_elapsed);
                if remaining == 0 {
                    return Decimal::ZERO;
                }
                let digits = Decimal::from(asset.life_years * (asset.life_years + 1))
                    / Decimal::TWO;
                base * Decimal::from(remaining) / digits
            }
        };
        let monthly = money::round_money(annual / Decimal::from(12u32));
        monthly.min(asset.depreciable_remaining()).max(Decimal::ZERO)
    }

    /// Runs monthly depreciation for every asset not yet depreciated in
    /// the period. Idempotent per (asset, period).
    ///
    /// # Errors
    ///
    /// Voucher admission errors propagate.
    pub fn depreciate(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
    ) -> LedgerResult<DepreciationOutcome> {
        let asset_ids: Vec<i64> = state.fixed_assets.keys().copied().collect();
        let mut charges = Vec::new();
        let mut total = Decimal::ZERO;

        for asset_id in asset_ids {
            let already = state
                .depreciations
                .iter()
                .any(|d| d.asset_id == asset_id && d.period == period);
            if already {
                continue;
            }
            let asset = state.fixed_assets.get(&asset_id).expect("key collected").clone();
            if asset.disposed_at.is_some() || asset.acquired_at > period.last_day() {
                continue;
            }
            let amount = Self::monthly_charge(&asset, period);
            if amount.is_zero() {
                continue;
            }

            let draft = VoucherDraft {
                date: period.last_day(),
                description: Some(format!("Depreciation {period} {}", asset.name)),
                entry_type: Default::default(),
                source_event_id: None,
                entries: vec![
                    EntryDraft {
                        account: config.accounts.admin_expense.clone(),
                        debit: amount,
                        ..Default::default()
                    },
                    EntryDraft {
                        account: config.accounts.accumulated_depreciation.clone(),
                        credit: amount,
                        ..Default::default()
                    },
                ],
            };
            let voucher = VoucherStore::submit(state, &draft, true)?;

            let asset = state.fixed_assets.get_mut(&asset_id).expect("present");
            asset.accumulated += amount;
            state.counters.depreciation += 1;
            state.depreciations.push(DepreciationRecord {
                id: state.counters.depreciation,
                asset_id,
                period,
                amount,
                voucher_id: voucher.voucher_id,
                created_at: Utc::now(),
            });
            charges.push((asset_id, amount, voucher.voucher_id));
            total += amount;
        }

        info!(%period, assets = charges.len(), %total, "depreciation run complete");
        Ok(DepreciationOutcome {
            period,
            charges,
            total,
        })
    }

    /// Recognizes an impairment loss on an asset.
    ///
    /// # Errors
    ///
    /// `ASSET_NOT_FOUND`; voucher admission errors propagate.
    pub fn impair(
        state: &mut LedgerState,
        config: &LedgerConfig,
        asset_id: i64,
        period: Period,
        amount: Decimal,
    ) -> LedgerResult<i64> {
        let amount = money::round_money(amount);
        let asset = state
            .fixed_assets
            .get(&asset_id)
            .cloned()
            .ok_or(LedgerError::AssetNotFound(asset_id))?;

        let draft = VoucherDraft {
            date: period.last_day(),
            description: Some(format!("Impairment {period} {}", asset.name)),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.impairment_loss.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.impairment_provision.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.fixed_assets.get_mut(&asset_id).expect("present").impairment += amount;
        state.counters.impairment += 1;
        state.impairments.push(ImpairmentRecord {
            id: state.counters.impairment,
            asset_id,
            period,
            amount,
            voucher_id: voucher.voucher_id,
            created_at: Utc::now(),
        });
        Ok(voucher.voucher_id)
    }

    /// Reverses previously recognized impairment.
    ///
    /// # Errors
    ///
    /// `ASSET_NOT_FOUND`; `IMPAIRMENT_REVERSAL_EXCEEDS` when the reversal
    /// exceeds what was recognized.
    pub fn reverse_impairment(
        state: &mut LedgerState,
        config: &LedgerConfig,
        asset_id: i64,
        period: Period,
        amount: Decimal,
    ) -> LedgerResult<i64> {
        let amount = money::round_money(amount);
        let asset = state
            .fixed_assets
            .get(&asset_id)
            .cloned()
            .ok_or(LedgerError::AssetNotFound(asset_id))?;
        if amount > asset.impairment {
            return Err(LedgerError::ImpairmentReversalExceeds {
                asset_id,
                amount,
                recorded: asset.impairment,
            });
        }

        let draft = VoucherDraft {
            date: period.last_day(),
            description: Some(format!("Impairment reversal {period} {}", asset.name)),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.impairment_provision.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.impairment_loss.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.fixed_assets.get_mut(&asset_id).expect("present").impairment -= amount;
        state.counters.impairment += 1;
        state.impairments.push(ImpairmentRecord {
            id: state.counters.impairment,
            asset_id,
            period,
            amount: -amount,
            voucher_id: voucher.voucher_id,
            created_at: Utc::now(),
        });
        Ok(voucher.voucher_id)
    }

    /// Disposes of an asset: writes the card off the books, banks any
    /// proceeds, and posts the gain or loss on disposal.
    ///
    /// # Errors
    ///
    /// `ASSET_NOT_FOUND`, `ASSET_DISPOSED`; voucher admission errors
    /// propagate.
    pub fn dispose(
        state: &mut LedgerState,
        config: &LedgerConfig,
        asset_id: i64,
        date: NaiveDate,
        proceeds: Decimal,
        description: Option<String>,
    ) -> LedgerResult<DisposalOutcome> {
        let proceeds = money::round_money(proceeds);
        let asset = state
            .fixed_assets
            .get(&asset_id)
            .cloned()
            .ok_or(LedgerError::AssetNotFound(asset_id))?;
        if asset.disposed_at.is_some() {
            return Err(LedgerError::AssetDisposed(asset_id));
        }

        let net_value = asset.net_value();
        let gain = money::round_money(proceeds - net_value);

        let mut entries = Vec::new();
        if proceeds > Decimal::ZERO {
            entries.push(EntryDraft {
                account: config.accounts.bank.clone(),
                description: Some("Disposal proceeds".into()),
                debit: proceeds,
                ..Default::default()
            });
        }
        if asset.accumulated > Decimal::ZERO {
            entries.push(EntryDraft {
                account: config.accounts.accumulated_depreciation.clone(),
                debit: asset.accumulated,
                ..Default::default()
            });
        }
        if asset.impairment > Decimal::ZERO {
            entries.push(EntryDraft {
                account: config.accounts.impairment_provision.clone(),
                debit: asset.impairment,
                ..Default::default()
            });
        }
        if !gain.is_zero() {
            entries.push(EntryDraft {
                account: config.accounts.disposal_gain_loss.clone(),
                description: Some(if gain > Decimal::ZERO {
                    "Gain on disposal".into()
                } else {
                    "Loss on disposal".into()
                }),
                debit: if gain < Decimal::ZERO { -gain } else { Decimal::ZERO },
                credit: if gain > Decimal::ZERO { gain } else { Decimal::ZERO },
                ..Default::default()
            });
        }
        entries.push(EntryDraft {
            account: config.accounts.fixed_asset.clone(),
            credit: asset.cost,
            ..Default::default()
        });

        let draft = VoucherDraft {
            date,
            description: description.or_else(|| Some(format!("Disposal of {}", asset.name))),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state
            .fixed_assets
            .get_mut(&asset_id)
            .expect("present")
            .disposed_at = Some(date);

        info!(asset_id, %proceeds, %gain, "fixed asset disposed");
        Ok(DisposalOutcome {
            asset_id,
            voucher_id: voucher.voucher_id,
            net_value,
            proceeds,
            gain,
        })
    }

    /// Opens a CIP project.
    #[must_use]
    pub fn add_cip_project(state: &mut LedgerState, name: &str) -> i64 {
        state.counters.cip_project += 1;
        let id = state.counters.cip_project;
        state.cip_projects.insert(
            id,
            CipProject {
                id,
                name: name.to_string(),
                cost: Decimal::ZERO,
                transferred: Decimal::ZERO,
                status: CipStatus::Ongoing,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Accumulates cost on a CIP project, posting CIP against bank.
    ///
    /// # Errors
    ///
    /// `CIP_PROJECT_NOT_FOUND`; voucher admission errors propagate.
    pub fn cip_spend(
        state: &mut LedgerState,
        config: &LedgerConfig,
        project_id: i64,
        amount: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<i64> {
        let amount = money::round_money(amount);
        let project = state
            .cip_projects
            .get(&project_id)
            .cloned()
            .ok_or(LedgerError::CipProjectNotFound(project_id))?;

        let draft = VoucherDraft {
            date,
            description: Some(format!("Construction cost {}", project.name)),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.construction_in_progress.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.bank.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;
        state.cip_projects.get_mut(&project_id).expect("present").cost += amount;
        Ok(voucher.voucher_id)
    }

    /// Transfers accumulated CIP cost to a fixed asset, partially or in
    /// full. A full transfer closes the project.
    ///
    /// Passing `asset_id = None` creates a new asset card with the
    /// transferred amount as cost.
    ///
    /// # Errors
    ///
    /// `CIP_PROJECT_NOT_FOUND`, `CIP_TRANSFER_EXCEEDS_COST`,
    /// `ASSET_NOT_FOUND`.
    #[allow(clippy::too_many_arguments)]
    pub fn cip_transfer(
        state: &mut LedgerState,
        config: &LedgerConfig,
        project_id: i64,
        asset_id: Option<i64>,
        amount: Decimal,
        date: NaiveDate,
        new_asset: Option<(String, Decimal, u32, DepreciationMethod)>,
    ) -> LedgerResult<CipTransfer> {
        let amount = money::round_money(amount);
        let project = state
            .cip_projects
            .get(&project_id)
            .cloned()
            .ok_or(LedgerError::CipProjectNotFound(project_id))?;
        if amount > project.remaining() {
            return Err(LedgerError::CipTransferExceedsCost {
                project_id,
                amount,
                remaining: project.remaining(),
            });
        }

        let target_asset_id = match asset_id {
            Some(id) => {
                if !state.fixed_assets.contains_key(&id) {
                    return Err(LedgerError::AssetNotFound(id));
                }
                id
            }
            None => {
                let (name, salvage, life_years, method) = new_asset.unwrap_or((
                    project.name.clone(),
                    Decimal::ZERO,
                    0,
                    DepreciationMethod::StraightLine,
                ));
                state.counters.fixed_asset += 1;
                let id = state.counters.fixed_asset;
                state.fixed_assets.insert(
                    id,
                    FixedAsset {
                        id,
                        name,
                        cost: Decimal::ZERO,
                        salvage: money::round_money(salvage),
                        life_years,
                        method,
                        acquired_at: date,
                        accumulated: Decimal::ZERO,
                        impairment: Decimal::ZERO,
                        dims: DimensionRefs::NONE,
                        disposed_at: None,
                        created_at: Utc::now(),
                    },
                );
                id
            }
        };

        let draft = VoucherDraft {
            date,
            description: Some(format!("Transfer from construction {}", project.name)),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.fixed_asset.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.construction_in_progress.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        {
            let project = state.cip_projects.get_mut(&project_id).expect("present");
            project.transferred += amount;
            if project.remaining().is_zero() {
                project.status = CipStatus::Transferred;
            }
        }
        state.fixed_assets.get_mut(&target_asset_id).expect("present").cost += amount;

        state.counters.cip_transfer += 1;
        let transfer = CipTransfer {
            id: state.counters.cip_transfer,
            project_id,
            asset_id: target_asset_id,
            amount,
            date,
            voucher_id: voucher.voucher_id,
            created_at: Utc::now(),
        };
        state.cip_transfers.push(transfer.clone());
        info!(project_id, asset_id = target_asset_id, %amount, "construction cost transferred");
        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_straight_line_monthly_charge() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Machine",
            dec!(12000),
            dec!(0),
            5,
            DepreciationMethod::StraightLine,
            date(1, 1),
        )
        .unwrap();

        let period: Period = "2025-01".parse().unwrap();
        let outcome = AssetService::depreciate(&mut state, &config, period).unwrap();
        // (12000 - 0) / 5 years / 12 months = 200.
        assert_eq!(outcome.total, dec!(200.00));
        assert_eq!(
            state.fixed_assets.get(&asset_id).unwrap().accumulated,
            dec!(200.00)
        );
    }

    #[test]
    fn test_depreciation_idempotent_per_period() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        AssetService::add_asset(
            &mut state,
            &config,
            "Machine",
            dec!(1200),
            dec!(0),
            1,
            DepreciationMethod::StraightLine,
            date(1, 1),
        )
        .unwrap();

        let period: Period = "2025-01".parse().unwrap();
        AssetService::depreciate(&mut state, &config, period).unwrap();
        let second = AssetService::depreciate(&mut state, &config, period).unwrap();
        assert!(second.charges.is_empty());
    }

    #[test]
    fn test_depreciation_capped_at_salvage() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Tool",
            dec!(1000),
            dec!(900),
            1,
            DepreciationMethod::StraightLine,
            date(1, 1),
        )
        .unwrap();

        // Annual base is 100; monthly 8.33. Run 13 periods: the total may
        // never exceed the base.
        let mut period: Period = "2025-01".parse().unwrap();
        for _ in 0..13 {
            AssetService::depreciate(&mut state, &config, period).unwrap();
            period = period.next();
        }
        let asset = state.fixed_assets.get(&asset_id).unwrap();
        assert!(asset.accumulated <= dec!(100.00));
        assert!(asset.net_value() >= dec!(900.00));
    }

    #[test]
    fn test_double_declining_declines() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Server",
            dec!(10000),
            dec!(0),
            5,
            DepreciationMethod::DoubleDeclining,
            date(1, 1),
        )
        .unwrap();

        let january: Period = "2025-01".parse().unwrap();
        AssetService::depreciate(&mut state, &config, january).unwrap();
        let first = state.fixed_assets.get(&asset_id).unwrap().accumulated;
        // 10000 * (2/5) / 12 = 333.33
        assert_eq!(first, dec!(333.33));

        AssetService::depreciate(&mut state, &config, january.next()).unwrap();
        let second = state.fixed_assets.get(&asset_id).unwrap().accumulated - first;
        assert!(second < first);
    }

    #[test]
    fn test_sum_of_years_first_year_fraction() {
        let asset = FixedAsset {
            id: 1,
            name: "Rig".into(),
            cost: dec!(15000),
            salvage: dec!(0),
            life_years: 5,
            method: DepreciationMethod::SumOfYears,
            acquired_at: date(1, 1),
            accumulated: Decimal::ZERO,
            impairment: Decimal::ZERO,
            dims: DimensionRefs::NONE,
            disposed_at: None,
            created_at: Utc::now(),
        };
        // First year: 5/15 of 15000 = 5000 a year, 416.67 monthly.
        let charge = AssetService::monthly_charge(&asset, "2025-03".parse().unwrap());
        assert_eq!(charge, dec!(416.67));
    }

    #[test]
    fn test_impairment_and_reversal() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Plant",
            dec!(5000),
            dec!(0),
            10,
            DepreciationMethod::StraightLine,
            date(1, 1),
        )
        .unwrap();

        let period: Period = "2025-01".parse().unwrap();
        AssetService::impair(&mut state, &config, asset_id, period, dec!(800)).unwrap();
        assert_eq!(state.fixed_assets.get(&asset_id).unwrap().impairment, dec!(800));

        assert!(matches!(
            AssetService::reverse_impairment(&mut state, &config, asset_id, period, dec!(900)),
            Err(LedgerError::ImpairmentReversalExceeds { .. })
        ));

        AssetService::reverse_impairment(&mut state, &config, asset_id, period, dec!(300))
            .unwrap();
        assert_eq!(state.fixed_assets.get(&asset_id).unwrap().impairment, dec!(500));
        assert_eq!(state.impairments.len(), 2);
        assert_eq!(state.impairments[1].amount, dec!(-300));
    }

    #[test]
    fn test_dispose_banks_proceeds_and_posts_loss() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Van",
            dec!(12000),
            dec!(2000),
            3,
            DepreciationMethod::StraightLine,
            date(1, 5),
        )
        .unwrap();
        AssetService::depreciate(&mut state, &config, "2025-01".parse().unwrap()).unwrap();

        // Book value 12000 - 277.78 = 11722.22; sold for 11000.
        let outcome = AssetService::dispose(
            &mut state,
            &config,
            asset_id,
            date(2, 1),
            dec!(11000),
            None,
        )
        .unwrap();
        assert_eq!(outcome.net_value, dec!(11722.22));
        assert_eq!(outcome.gain, dec!(-722.22));

        let voucher = state.voucher(outcome.voucher_id).unwrap();
        let line = |account: &str| {
            voucher
                .entries
                .iter()
                .find(|e| e.account_code == account)
                .unwrap()
        };
        assert_eq!(line("1002").debit, dec!(11000));
        assert_eq!(line("1602").debit, dec!(277.78));
        assert_eq!(line("1601").credit, dec!(12000));
        assert_eq!(line(&config.accounts.disposal_gain_loss).debit, dec!(722.22));

        // Disposed assets stop depreciating and cannot be disposed twice.
        let run = AssetService::depreciate(&mut state, &config, "2025-02".parse().unwrap())
            .unwrap();
        assert!(run.charges.is_empty());
        assert!(matches!(
            AssetService::dispose(&mut state, &config, asset_id, date(2, 2), Decimal::ZERO, None),
            Err(LedgerError::AssetDisposed(_))
        ));
    }

    #[test]
    fn test_dispose_at_a_gain() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let asset_id = AssetService::add_asset(
            &mut state,
            &config,
            "Press",
            dec!(5000),
            dec!(0),
            10,
            DepreciationMethod::StraightLine,
            date(1, 5),
        )
        .unwrap();

        let outcome = AssetService::dispose(
            &mut state,
            &config,
            asset_id,
            date(1, 20),
            dec!(5600),
            None,
        )
        .unwrap();
        assert_eq!(outcome.gain, dec!(600.00));

        let voucher = state.voucher(outcome.voucher_id).unwrap();
        let gain_line = voucher
            .entries
            .iter()
            .find(|e| e.account_code == config.accounts.disposal_gain_loss)
            .unwrap();
        assert_eq!(gain_line.credit, dec!(600.00));
    }

    #[test]
    fn test_cip_partial_and_full_transfer() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let project_id = AssetService::add_cip_project(&mut state, "Warehouse");
        AssetService::cip_spend(&mut state, &config, project_id, dec!(8000), date(2, 10))
            .unwrap();

        let first = AssetService::cip_transfer(
            &mut state,
            &config,
            project_id,
            None,
            dec!(5000),
            date(3, 1),
            Some(("Warehouse building".into(), dec!(0), 20, DepreciationMethod::StraightLine)),
        )
        .unwrap();
        let project = state.cip_projects.get(&project_id).unwrap();
        assert_eq!(project.status, CipStatus::Ongoing);
        assert_eq!(project.remaining(), dec!(3000));

        let second = AssetService::cip_transfer(
            &mut state,
            &config,
            project_id,
            Some(first.asset_id),
            dec!(3000),
            date(3, 15),
            None,
        )
        .unwrap();
        assert_eq!(second.asset_id, first.asset_id);
        let project = state.cip_projects.get(&project_id).unwrap();
        assert_eq!(project.status, CipStatus::Transferred);
        assert_eq!(
            state.fixed_assets.get(&first.asset_id).unwrap().cost,
            dec!(8000)
        );
    }

    #[test]
    fn test_cip_transfer_cannot_exceed_cost() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let project_id = AssetService::add_cip_project(&mut state, "Line");
        AssetService::cip_spend(&mut state, &config, project_id, dec!(1000), date(2, 10))
            .unwrap();

        assert!(matches!(
            AssetService::cip_transfer(
                &mut state,
                &config,
                project_id,
                None,
                dec!(2000),
                date(3, 1),
                None,
            ),
            Err(LedgerError::CipTransferExceedsCost { .. })
        ));
    }
}
