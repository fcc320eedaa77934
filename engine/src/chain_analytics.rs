//! Options snapshot derived from one expiry of a chain: ATM volatility and
//! premiums, put/call ratios, max pain, unusual activity and skew.

use crate::legs::atm_index;
use crate::models::{ChainRow, MarketState, OptionChain, OptionRight, UnusualActivity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TARGET_EXPIRY_DTE: i64 = 30;
pub const MIN_EXPIRY_DTE: i64 = 7;
pub const PREFERRED_DTE_MIN: i64 = 15;
pub const PREFERRED_DTE_MAX: i64 = 50;
pub const UNUSUAL_VOLUME_MULTIPLE: f64 = 2.0;
pub const UNUSUAL_TOP_N: usize = 5;
pub const SKEW_OTM_PCT: f64 = 0.05;

/// One listed expiry and its chain, as read from a chain file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryChain {
    pub expiry: NaiveDate,
    #[serde(flatten)]
    pub chain: OptionChain,
}

/// Picks the expiry with 15-50 DTE closest to 30. Otherwise the first
/// expiry more than a week out, otherwise the first listed.
pub fn select_expiry(expiries: &[NaiveDate], today: NaiveDate) -> Option<(NaiveDate, i64)> {
    let mut preferred: Option<(NaiveDate, i64)> = None;
    let mut fallback: Option<(NaiveDate, i64)> = None;

    for &expiry in expiries {
        let dte = (expiry - today).num_days();
        if dte < MIN_EXPIRY_DTE {
            continue;
        }
        if (PREFERRED_DTE_MIN..=PREFERRED_DTE_MAX).contains(&dte) {
            let closer = preferred
                .map(|(_, best)| (dte - TARGET_EXPIRY_DTE).abs() < (best - TARGET_EXPIRY_DTE).abs())
                .unwrap_or(true);
            if closer {
                preferred = Some((expiry, dte));
            }
        } else if fallback.is_none() && dte > MIN_EXPIRY_DTE {
            fallback = Some((expiry, dte));
        }
    }

    preferred.or(fallback).or_else(|| {
        expiries
            .first()
            .map(|&expiry| (expiry, (expiry - today).num_days()))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsSnapshot {
    pub dte: Option<i64>,
    pub atm_strike: Option<f64>,
    pub atm_iv: Option<f64>,
    pub atm_call_premium: Option<f64>,
    pub atm_put_premium: Option<f64>,
    pub atm_call_premium_pct: Option<f64>,
    pub atm_put_premium_pct: Option<f64>,
    pub put_call_ratio_volume: Option<f64>,
    pub put_call_ratio_oi: Option<f64>,
    pub max_pain: Option<f64>,
    pub unusual_activity: Vec<UnusualActivity>,
    pub iv_skew: Option<f64>,
}

impl OptionsSnapshot {
    pub fn from_chain(chain: &OptionChain, spot: f64, dte: Option<i64>) -> Self {
        let atm_strike = atm_index(&chain.calls, spot)
            .map(|idx| chain.calls[idx].strike)
            .or_else(|| atm_index(&chain.puts, spot).map(|idx| chain.puts[idx].strike));

        let atm_call = atm_strike.and_then(|strike| row_at(&chain.calls, strike));
        let atm_put = atm_strike.and_then(|strike| row_at(&chain.puts, strike));

        let ivs: Vec<f64> = [atm_call, atm_put]
            .iter()
            .flatten()
            .filter_map(|row| row.implied_volatility)
            .filter(|iv| *iv > 0.0)
            .collect();
        let atm_iv = (!ivs.is_empty()).then(|| ivs.iter().sum::<f64>() / ivs.len() as f64);

        let atm_call_premium = atm_call.and_then(ChainRow::premium);
        let atm_put_premium = atm_put.and_then(ChainRow::premium);
        let pct_of_spot = |premium: Option<f64>| premium.filter(|_| spot > 0.0).map(|p| p / spot);

        Self {
            dte,
            atm_strike,
            atm_iv,
            atm_call_premium,
            atm_put_premium,
            atm_call_premium_pct: pct_of_spot(atm_call_premium),
            atm_put_premium_pct: pct_of_spot(atm_put_premium),
            put_call_ratio_volume: ratio(
                side_total(&chain.puts, |row| row.volume),
                side_total(&chain.calls, |row| row.volume),
            ),
            put_call_ratio_oi: ratio(
                side_total(&chain.puts, |row| row.open_interest),
                side_total(&chain.calls, |row| row.open_interest),
            ),
            max_pain: max_pain(chain),
            unusual_activity: unusual_activity(chain),
            iv_skew: iv_skew(chain, spot),
        }
    }

    pub fn apply_to(&self, state: &mut MarketState) {
        state.atm_iv = self.atm_iv;
        state.iv_skew = self.iv_skew;
        state.put_call_ratio = self.put_call_ratio_volume;
        state.max_pain = self.max_pain;
        state.unusual_activity = Some(self.unusual_activity.clone());
        state.dte = self.dte;
    }
}

fn row_at(rows: &[ChainRow], strike: f64) -> Option<&ChainRow> {
    rows.iter().find(|row| row.strike == strike)
}

fn side_total(rows: &[ChainRow], field: impl Fn(&ChainRow) -> Option<f64>) -> f64 {
    rows.iter()
        .filter_map(field)
        .filter(|value| value.is_finite())
        .sum()
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Strike minimising the intrinsic value owed to open interest at expiry.
/// Ties go to the lower strike.
pub fn max_pain(chain: &OptionChain) -> Option<f64> {
    let mut strikes: Vec<f64> = chain
        .calls
        .iter()
        .chain(&chain.puts)
        .map(|row| row.strike)
        .collect();
    strikes.sort_by(f64::total_cmp);
    strikes.dedup();

    let mut best: Option<(f64, f64)> = None;
    for test_strike in strikes {
        let call_pain: f64 = chain
            .calls
            .iter()
            .map(|row| (test_strike - row.strike).max(0.0) * row.open_interest.unwrap_or(0.0))
            .sum();
        let put_pain: f64 = chain
            .puts
            .iter()
            .map(|row| (row.strike - test_strike).max(0.0) * row.open_interest.unwrap_or(0.0))
            .sum();
        let total = call_pain + put_pain;
        if best.map(|(_, lowest)| total < lowest).unwrap_or(true) {
            best = Some((test_strike, total));
        }
    }
    best.map(|(strike, _)| strike)
}

/// Rows trading more than twice their open interest, largest volume first.
pub fn unusual_activity(chain: &OptionChain) -> Vec<UnusualActivity> {
    let mut flagged: Vec<UnusualActivity> = [OptionRight::Call, OptionRight::Put]
        .into_iter()
        .flat_map(|right| {
            chain.side(right).iter().filter_map(move |row| {
                let volume = row.volume.unwrap_or(0.0);
                let open_interest = row.open_interest.unwrap_or(0.0);
                (open_interest > 0.0 && volume > UNUSUAL_VOLUME_MULTIPLE * open_interest).then(
                    || UnusualActivity {
                        right,
                        strike: row.strike,
                        volume,
                        open_interest,
                        ratio: volume / open_interest,
                    },
                )
            })
        })
        .collect();
    flagged.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    flagged.truncate(UNUSUAL_TOP_N);
    flagged
}

/// IV of the put nearest 5% below spot minus IV of the call nearest 5% above.
pub fn iv_skew(chain: &OptionChain, spot: f64) -> Option<f64> {
    let put = nearest_row(&chain.puts, spot * (1.0 - SKEW_OTM_PCT), |strike| strike <= spot)?;
    let call = nearest_row(&chain.calls, spot * (1.0 + SKEW_OTM_PCT), |strike| strike >= spot)?;
    let put_iv = put.implied_volatility.filter(|iv| *iv > 0.0)?;
    let call_iv = call.implied_volatility.filter(|iv| *iv > 0.0)?;
    Some(put_iv - call_iv)
}

fn nearest_row(
    rows: &[ChainRow],
    target: f64,
    keep: impl Fn(f64) -> bool,
) -> Option<&ChainRow> {
    let mut best: Option<&ChainRow> = None;
    for row in rows.iter().filter(|row| keep(row.strike)) {
        match best {
            Some(current) if (current.strike - target).abs() <= (row.strike - target).abs() => {}
            _ => best = Some(row),
        }
    }
    best
}
