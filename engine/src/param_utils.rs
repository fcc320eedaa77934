use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Extract a parameter as f64 with a default value
pub fn get_param_f64(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Extract a parameter as f64, clamped to a range with finite checks
pub fn get_param_f64_clamped(
    params: &HashMap<String, f64>,
    key: &str,
    default: f64,
    min: f64,
    max: f64,
) -> f64 {
    let raw = params.get(key).copied().unwrap_or(default);
    if !raw.is_finite() {
        return default;
    }
    raw.clamp(min, max)
}

/// Get a parameter as usize with a minimum value
pub fn get_usize_param_min(
    params: &HashMap<String, f64>,
    key: &str,
    default: usize,
    min: usize,
) -> usize {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.round().max(min as f64) as usize)
        .unwrap_or(default)
}

/// Get a parameter rounded to an i64 with a minimum value
pub fn get_rounded_param_min(params: &HashMap<String, f64>, key: &str, default: i64, min: i64) -> i64 {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| (v.round() as i64).max(min))
        .unwrap_or(default)
}

/// Parse `key=value` pairs as passed on the command line.
pub fn parse_param_assignments(raw: &[String]) -> Result<HashMap<String, f64>> {
    let mut params = HashMap::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Parameter must look like key=value (value: {})", entry))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Parameter name is empty (value: {})", entry));
        }
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("Parameter {} must be a number (value: {})", key, value))?;
        if !parsed.is_finite() {
            return Err(anyhow!("Parameter {} must be finite (value: {})", key, value));
        }
        params.insert(key.to_string(), parsed);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_param_falls_back_on_non_finite() {
        let mut params = HashMap::new();
        params.insert("x".to_string(), f64::NAN);
        params.insert("y".to_string(), 5.0);
        assert_eq!(get_param_f64_clamped(&params, "x", 0.5, 0.0, 1.0), 0.5);
        assert_eq!(get_param_f64_clamped(&params, "y", 0.5, 0.0, 1.0), 1.0);
        assert_eq!(get_param_f64(&params, "x", 2.0), 2.0);
    }

    #[test]
    fn usize_param_rounds_and_enforces_minimum() {
        let mut params = HashMap::new();
        params.insert("lookback".to_string(), 2.6);
        assert_eq!(get_usize_param_min(&params, "lookback", 50, 5), 5);
        params.insert("lookback".to_string(), 40.4);
        assert_eq!(get_usize_param_min(&params, "lookback", 50, 5), 40);
        assert_eq!(get_usize_param_min(&params, "missing", 50, 5), 50);
        assert_eq!(get_rounded_param_min(&params, "lookback", 30, 1), 40);
    }

    #[test]
    fn assignments_parse_and_reject_garbage() {
        let parsed =
            parse_param_assignments(&["targetDte=45".to_string(), " minVolatility = 0.1".to_string()])
                .unwrap();
        assert_eq!(parsed.get("targetDte"), Some(&45.0));
        assert_eq!(parsed.get("minVolatility"), Some(&0.1));

        assert!(parse_param_assignments(&["targetDte".to_string()]).is_err());
        assert!(parse_param_assignments(&["=3".to_string()]).is_err());
        assert!(parse_param_assignments(&["x=abc".to_string()]).is_err());
    }
}
