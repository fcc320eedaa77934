use crate::models::DEFAULT_CONTRACT_MULTIPLIER;
use crate::param_utils::{
    get_param_f64_clamped, get_rounded_param_min, get_usize_param_min,
};
use anyhow::{anyhow, Result};
use std::collections::HashMap;

pub const SETTINGS_ENV_PREFIX: &str = "OPTIONS_ENGINE_";

/// Process-wide settings shared by the recommender and both backtesters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub risk_free_rate: f64,
    pub contract_multiplier: u32,
    pub target_dte: i64,
    pub lookback_days: usize,
    pub volatility_window: usize,
    pub min_volatility: f64,
    pub signal_max_hold_days: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            contract_multiplier: DEFAULT_CONTRACT_MULTIPLIER,
            target_dte: 30,
            lookback_days: 50,
            volatility_window: 20,
            min_volatility: 0.05,
            signal_max_hold_days: 30,
        }
    }
}

impl EngineSettings {
    /// Missing keys keep their defaults; present keys must parse and be in range.
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let risk_free_rate = setting_f64(
            settings,
            "RISK_FREE_RATE",
            defaults.risk_free_rate,
            Some(-0.05),
            Some(0.25),
        )?;
        let contract_multiplier = setting_usize(
            settings,
            "CONTRACT_MULTIPLIER",
            defaults.contract_multiplier as usize,
            1,
        )?;
        let target_dte = setting_usize(settings, "TARGET_DTE", defaults.target_dte as usize, 1)?;
        let lookback_days = setting_usize(settings, "LOOKBACK_DAYS", defaults.lookback_days, 2)?;
        let volatility_window =
            setting_usize(settings, "VOLATILITY_WINDOW", defaults.volatility_window, 2)?;
        let min_volatility = setting_f64(
            settings,
            "MIN_VOLATILITY",
            defaults.min_volatility,
            Some(0.0),
            None,
        )?;
        let signal_max_hold_days = setting_usize(
            settings,
            "SIGNAL_MAX_HOLD_DAYS",
            defaults.signal_max_hold_days,
            0,
        )?;

        if volatility_window > lookback_days {
            return Err(anyhow!(
                "VOLATILITY_WINDOW ({}) must be <= LOOKBACK_DAYS ({})",
                volatility_window,
                lookback_days
            ));
        }

        Ok(Self {
            risk_free_rate,
            contract_multiplier: u32::try_from(contract_multiplier)
                .map_err(|_| anyhow!("CONTRACT_MULTIPLIER is too large ({})", contract_multiplier))?,
            target_dte: target_dte as i64,
            lookback_days,
            volatility_window,
            min_volatility,
            signal_max_hold_days,
        })
    }

    /// Reads `OPTIONS_ENGINE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(SETTINGS_ENV_PREFIX)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect();
        Self::from_settings_map(&settings)
    }
}

/// Strike-selection knobs, all expressed as fractions of spot.
#[derive(Debug, Clone, PartialEq)]
pub struct LegSelectionConfig {
    pub covered_call_otm_pct: f64,
    pub protective_put_otm_pct: f64,
    pub spread_min_width_pct: f64,
    pub spread_max_width_pct: f64,
    pub condor_short_otm_pct: f64,
    pub condor_wing_width_pct: f64,
    pub contract_multiplier: u32,
}

impl Default for LegSelectionConfig {
    fn default() -> Self {
        Self {
            covered_call_otm_pct: 0.03,
            protective_put_otm_pct: 0.05,
            spread_min_width_pct: 0.03,
            spread_max_width_pct: 0.10,
            condor_short_otm_pct: 0.05,
            condor_wing_width_pct: 0.05,
            contract_multiplier: DEFAULT_CONTRACT_MULTIPLIER,
        }
    }
}

impl LegSelectionConfig {
    pub fn from_parameters(parameters: &HashMap<String, f64>, settings: &EngineSettings) -> Self {
        let defaults = Self::default();
        let spread_min_width_pct = get_param_f64_clamped(
            parameters,
            "spreadMinWidthPct",
            defaults.spread_min_width_pct,
            0.0,
            0.5,
        );
        let spread_max_width_pct = get_param_f64_clamped(
            parameters,
            "spreadMaxWidthPct",
            defaults.spread_max_width_pct,
            0.0,
            0.5,
        )
        .max(spread_min_width_pct);

        Self {
            covered_call_otm_pct: get_param_f64_clamped(
                parameters,
                "coveredCallOtmPct",
                defaults.covered_call_otm_pct,
                0.0,
                0.5,
            ),
            protective_put_otm_pct: get_param_f64_clamped(
                parameters,
                "protectivePutOtmPct",
                defaults.protective_put_otm_pct,
                0.0,
                0.5,
            ),
            spread_min_width_pct,
            spread_max_width_pct,
            condor_short_otm_pct: get_param_f64_clamped(
                parameters,
                "condorShortOtmPct",
                defaults.condor_short_otm_pct,
                0.0,
                0.5,
            ),
            condor_wing_width_pct: get_param_f64_clamped(
                parameters,
                "condorWingWidthPct",
                defaults.condor_wing_width_pct,
                0.001,
                0.5,
            ),
            contract_multiplier: settings.contract_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub target_dte: i64,
    pub lookback_days: usize,
    pub volatility_window: usize,
    pub min_volatility: f64,
    pub risk_free_rate: f64,
    pub legs: LegSelectionConfig,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self::from_parameters(&HashMap::new(), &EngineSettings::default())
    }
}

impl WalkForwardConfig {
    pub fn from_parameters(parameters: &HashMap<String, f64>, settings: &EngineSettings) -> Self {
        let lookback_days =
            get_usize_param_min(parameters, "lookbackDays", settings.lookback_days, 2);
        Self {
            target_dte: get_rounded_param_min(parameters, "targetDte", settings.target_dte, 1),
            lookback_days,
            volatility_window: get_usize_param_min(
                parameters,
                "volatilityWindow",
                settings.volatility_window,
                2,
            )
            .min(lookback_days),
            min_volatility: get_param_f64_clamped(
                parameters,
                "minVolatility",
                settings.min_volatility,
                0.0,
                5.0,
            ),
            risk_free_rate: get_param_f64_clamped(
                parameters,
                "riskFreeRate",
                settings.risk_free_rate,
                -0.05,
                0.25,
            ),
            legs: LegSelectionConfig::from_parameters(parameters, settings),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalBacktestConfig {
    /// `None` holds until an exit signal or the end of the series.
    pub max_hold_days: Option<usize>,
    pub min_history: usize,
}

impl Default for SignalBacktestConfig {
    fn default() -> Self {
        Self::from_parameters(&HashMap::new(), &EngineSettings::default())
    }
}

impl SignalBacktestConfig {
    pub fn from_parameters(parameters: &HashMap<String, f64>, settings: &EngineSettings) -> Self {
        let max_hold_days =
            get_usize_param_min(parameters, "maxHoldDays", settings.signal_max_hold_days, 0);
        Self {
            max_hold_days: (max_hold_days > 0).then_some(max_hold_days),
            min_history: get_usize_param_min(parameters, "minHistory", 30, 2),
        }
    }
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    default: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<f64> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(default);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(anyhow!(
                "Setting {} must be >= {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    if let Some(max_value) = max {
        if value > max_value {
            return Err(anyhow!(
                "Setting {} must be <= {} (value: {})",
                key,
                max_value,
                raw
            ));
        }
    }
    Ok(value)
}

fn setting_usize(
    settings: &HashMap<String, String>,
    key: &str,
    default: usize,
    min: usize,
) -> Result<usize> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(default);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if value.fract() != 0.0 {
        return Err(anyhow!(
            "Setting {} must be an integer (value: {})",
            key,
            raw
        ));
    }
    if value < min as f64 {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(value as usize)
}
