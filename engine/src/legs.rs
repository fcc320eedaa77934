//! Strike selection and leg construction against a single-expiry chain.

use crate::config::LegSelectionConfig;
use crate::error::ChainError;
use crate::models::{ChainRow, LegAction, OptionChain, OptionLeg, OptionRight};

const STRIKE_TOLERANCE: f64 = 1e-6;

/// Which strike a structure anchors on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeTarget {
    /// Nearest strike to spot, ties to the lower strike.
    AtTheMoney,
    /// Lowest strike at or above spot.
    AtOrAboveSpot,
    /// Lowest strike at or above spot plus the covered-call OTM percentage.
    CoveredCallOtm,
    /// Highest strike at or below spot minus the protective-put OTM percentage.
    ProtectivePutOtm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumFlow {
    Debit,
    Credit,
}

/// The leg-construction rule of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegShape {
    /// One short option.
    SingleShort {
        right: OptionRight,
        target: StrikeTarget,
    },
    /// Anchor leg plus a partner further out of the money (above for calls,
    /// below for puts). The anchor is bought for debit spreads and sold for
    /// credit spreads.
    Vertical {
        right: OptionRight,
        flow: PremiumFlow,
        anchor: StrikeTarget,
    },
    IronCondor,
    Straddle,
}

pub trait LegBuilder {
    fn build(
        &self,
        spot: f64,
        chain: &OptionChain,
        config: &LegSelectionConfig,
    ) -> Result<Vec<OptionLeg>, ChainError>;
}

pub fn create_leg_builder(shape: LegShape) -> Box<dyn LegBuilder + Send + Sync> {
    match shape {
        LegShape::SingleShort { right, target } => Box::new(SingleLegBuilder { right, target }),
        LegShape::Vertical {
            right,
            flow,
            anchor,
        } => Box::new(VerticalSpreadBuilder {
            right,
            flow,
            anchor,
        }),
        LegShape::IronCondor => Box::new(IronCondorBuilder),
        LegShape::Straddle => Box::new(StraddleBuilder),
    }
}

/// Index of the strike nearest `spot`; ties go to the lower strike.
pub fn atm_index(rows: &[ChainRow], spot: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, row) in rows.iter().enumerate() {
        let distance = (row.strike - spot).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn atm_row(rows: &[ChainRow], spot: f64) -> Option<&ChainRow> {
    atm_index(rows, spot).map(|idx| &rows[idx])
}

/// Lowest strike at or above `target`.
pub fn first_at_or_above(rows: &[ChainRow], target: f64) -> Option<usize> {
    rows.iter().position(|row| row.strike >= target - STRIKE_TOLERANCE)
}

/// Highest strike at or below `target`.
pub fn last_at_or_below(rows: &[ChainRow], target: f64) -> Option<usize> {
    rows.iter().rposition(|row| row.strike <= target + STRIKE_TOLERANCE)
}

/// Partner strike for a vertical spread: the narrowest gap from the anchor
/// that falls inside the configured width band, on the out-of-the-money side.
pub fn spread_partner(
    rows: &[ChainRow],
    anchor: usize,
    right: OptionRight,
    spot: f64,
    config: &LegSelectionConfig,
) -> Option<usize> {
    let anchor_strike = rows.get(anchor)?.strike;
    let min_gap = spot * config.spread_min_width_pct - STRIKE_TOLERANCE;
    let max_gap = spot * config.spread_max_width_pct + STRIKE_TOLERANCE;

    let candidates: Vec<usize> = match right {
        OptionRight::Call => (anchor + 1..rows.len()).collect(),
        OptionRight::Put => (0..anchor).rev().collect(),
    };

    candidates.into_iter().find(|&idx| {
        let gap = (rows[idx].strike - anchor_strike).abs();
        gap >= min_gap && gap <= max_gap
    })
}

fn side(chain: &OptionChain, right: OptionRight) -> Result<&[ChainRow], ChainError> {
    let rows = chain.side(right);
    if rows.is_empty() {
        return Err(ChainError::EmptySide(right));
    }
    Ok(rows)
}

fn select_target(
    rows: &[ChainRow],
    right: OptionRight,
    target: StrikeTarget,
    spot: f64,
    config: &LegSelectionConfig,
) -> Result<usize, ChainError> {
    let (found, description, level) = match target {
        StrikeTarget::AtTheMoney => (atm_index(rows, spot), "near", spot),
        StrikeTarget::AtOrAboveSpot => (first_at_or_above(rows, spot), "at or above", spot),
        StrikeTarget::CoveredCallOtm => {
            let level = spot * (1.0 + config.covered_call_otm_pct);
            (first_at_or_above(rows, level), "at or above", level)
        }
        StrikeTarget::ProtectivePutOtm => {
            let level = spot * (1.0 - config.protective_put_otm_pct);
            (last_at_or_below(rows, level), "at or below", level)
        }
    };
    found.ok_or(ChainError::NoStrikeInBand {
        right,
        description,
        target: level,
    })
}

fn priced_leg(
    row: &ChainRow,
    action: LegAction,
    right: OptionRight,
    config: &LegSelectionConfig,
) -> Result<OptionLeg, ChainError> {
    let premium = row.premium().ok_or(ChainError::MissingPremium {
        right,
        strike: row.strike,
    })?;
    Ok(OptionLeg::new(action, right, row.strike, premium).with_multiplier(config.contract_multiplier))
}

fn validate_spot(spot: f64) -> Result<(), ChainError> {
    if spot.is_finite() && spot > 0.0 {
        Ok(())
    } else {
        Err(ChainError::MissingSpot)
    }
}

/// Covered call and cash-secured put.
pub struct SingleLegBuilder {
    pub right: OptionRight,
    pub target: StrikeTarget,
}

impl LegBuilder for SingleLegBuilder {
    fn build(
        &self,
        spot: f64,
        chain: &OptionChain,
        config: &LegSelectionConfig,
    ) -> Result<Vec<OptionLeg>, ChainError> {
        validate_spot(spot)?;
        let rows = side(chain, self.right)?;
        let idx = select_target(rows, self.right, self.target, spot, config)?;
        Ok(vec![priced_leg(&rows[idx], LegAction::Sell, self.right, config)?])
    }
}

/// Bull call, bear call and the protective put debit spread.
pub struct VerticalSpreadBuilder {
    pub right: OptionRight,
    pub flow: PremiumFlow,
    pub anchor: StrikeTarget,
}

impl LegBuilder for VerticalSpreadBuilder {
    fn build(
        &self,
        spot: f64,
        chain: &OptionChain,
        config: &LegSelectionConfig,
    ) -> Result<Vec<OptionLeg>, ChainError> {
        validate_spot(spot)?;
        let rows = side(chain, self.right)?;
        let anchor = select_target(rows, self.right, self.anchor, spot, config)?;
        let partner = spread_partner(rows, anchor, self.right, spot, config).ok_or(
            ChainError::NoStrikeInBand {
                right: self.right,
                description: "within spread width of",
                target: rows[anchor].strike,
            },
        )?;

        let (anchor_action, partner_action) = match self.flow {
            PremiumFlow::Debit => (LegAction::Buy, LegAction::Sell),
            PremiumFlow::Credit => (LegAction::Sell, LegAction::Buy),
        };
        Ok(vec![
            priced_leg(&rows[anchor], anchor_action, self.right, config)?,
            priced_leg(&rows[partner], partner_action, self.right, config)?,
        ])
    }
}

/// Short strangle at the configured OTM distance, protected by wings the
/// configured width further out.
pub struct IronCondorBuilder;

impl LegBuilder for IronCondorBuilder {
    fn build(
        &self,
        spot: f64,
        chain: &OptionChain,
        config: &LegSelectionConfig,
    ) -> Result<Vec<OptionLeg>, ChainError> {
        validate_spot(spot)?;
        let calls = side(chain, OptionRight::Call)?;
        let puts = side(chain, OptionRight::Put)?;
        let wing = spot * config.condor_wing_width_pct;

        let call_level = spot * (1.0 + config.condor_short_otm_pct);
        let short_call = first_at_or_above(calls, call_level).ok_or(ChainError::NoStrikeInBand {
            right: OptionRight::Call,
            description: "at or above",
            target: call_level,
        })?;
        let put_level = spot * (1.0 - config.condor_short_otm_pct);
        let short_put = last_at_or_below(puts, put_level).ok_or(ChainError::NoStrikeInBand {
            right: OptionRight::Put,
            description: "at or below",
            target: put_level,
        })?;

        let call_wing_level = calls[short_call].strike + wing;
        let long_call = first_at_or_above(&calls[short_call + 1..], call_wing_level)
            .map(|offset| short_call + 1 + offset)
            .ok_or(ChainError::NoStrikeInBand {
                right: OptionRight::Call,
                description: "at or above",
                target: call_wing_level,
            })?;
        let put_wing_level = puts[short_put].strike - wing;
        let long_put = last_at_or_below(&puts[..short_put], put_wing_level).ok_or(
            ChainError::NoStrikeInBand {
                right: OptionRight::Put,
                description: "at or below",
                target: put_wing_level,
            },
        )?;

        Ok(vec![
            priced_leg(&puts[short_put], LegAction::Sell, OptionRight::Put, config)?,
            priced_leg(&puts[long_put], LegAction::Buy, OptionRight::Put, config)?,
            priced_leg(&calls[short_call], LegAction::Sell, OptionRight::Call, config)?,
            priced_leg(&calls[long_call], LegAction::Buy, OptionRight::Call, config)?,
        ])
    }
}

/// Long call and long put at the ATM call strike.
pub struct StraddleBuilder;

impl LegBuilder for StraddleBuilder {
    fn build(
        &self,
        spot: f64,
        chain: &OptionChain,
        config: &LegSelectionConfig,
    ) -> Result<Vec<OptionLeg>, ChainError> {
        validate_spot(spot)?;
        let calls = side(chain, OptionRight::Call)?;
        let puts = side(chain, OptionRight::Put)?;
        let call_idx = atm_index(calls, spot).ok_or(ChainError::EmptySide(OptionRight::Call))?;
        let strike = calls[call_idx].strike;
        let put_row = puts
            .iter()
            .find(|row| (row.strike - strike).abs() <= STRIKE_TOLERANCE)
            .ok_or(ChainError::StraddleStrikeMismatch { strike })?;

        Ok(vec![
            priced_leg(&calls[call_idx], LegAction::Buy, OptionRight::Call, config)?,
            priced_leg(put_row, LegAction::Buy, OptionRight::Put, config)?,
        ])
    }
}
