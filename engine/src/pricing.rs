use crate::models::OptionRight;
use std::f64::consts::SQRT_2;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Standard normal cumulative distribution function.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / SQRT_2))
}

pub fn years_from_days(days: f64) -> f64 {
    days / DAYS_PER_YEAR
}

pub fn intrinsic_value(right: OptionRight, spot: f64, strike: f64) -> f64 {
    match right {
        OptionRight::Call => (spot - strike).max(0.0),
        OptionRight::Put => (strike - spot).max(0.0),
    }
}

fn is_degenerate(spot: f64, strike: f64, time_years: f64, volatility: f64) -> bool {
    time_years <= 0.0 || volatility <= 0.0 || spot <= 0.0 || strike <= 0.0
}

fn d1_d2(spot: f64, strike: f64, time_years: f64, volatility: f64, rate: f64) -> (f64, f64) {
    let vol_sqrt_t = volatility * time_years.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * volatility * volatility) * time_years) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// European call value. Falls back to intrinsic value when there is no time
/// or no volatility left.
pub fn call_price(spot: f64, strike: f64, time_years: f64, volatility: f64, rate: f64) -> f64 {
    if is_degenerate(spot, strike, time_years, volatility) {
        return intrinsic_value(OptionRight::Call, spot, strike);
    }
    let (d1, d2) = d1_d2(spot, strike, time_years, volatility, rate);
    spot * norm_cdf(d1) - strike * (-rate * time_years).exp() * norm_cdf(d2)
}

/// European put value. Falls back to intrinsic value when there is no time
/// or no volatility left.
pub fn put_price(spot: f64, strike: f64, time_years: f64, volatility: f64, rate: f64) -> f64 {
    if is_degenerate(spot, strike, time_years, volatility) {
        return intrinsic_value(OptionRight::Put, spot, strike);
    }
    let (d1, d2) = d1_d2(spot, strike, time_years, volatility, rate);
    strike * (-rate * time_years).exp() * norm_cdf(-d2) - spot * norm_cdf(-d1)
}

pub fn option_price(
    right: OptionRight,
    spot: f64,
    strike: f64,
    time_years: f64,
    volatility: f64,
    rate: f64,
) -> f64 {
    match right {
        OptionRight::Call => call_price(spot, strike, time_years, volatility, rate),
        OptionRight::Put => put_price(spot, strike, time_years, volatility, rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_call_parity_holds_across_grid() {
        let rate = 0.05;
        for &spot in &[50.0, 100.0, 250.0] {
            for &strike in &[0.8 * spot, spot, 1.2 * spot] {
                for &t in &[7.0 / 365.0, 0.25, 1.0] {
                    for &vol in &[0.1, 0.3, 0.8] {
                        let lhs = call_price(spot, strike, t, vol, rate)
                            - put_price(spot, strike, t, vol, rate);
                        let rhs = spot - strike * (-rate * t).exp();
                        assert!((lhs - rhs).abs() < 1e-9, "S={spot} K={strike} T={t} v={vol}");
                    }
                }
            }
        }
    }

    #[test]
    fn expired_call_is_intrinsic() {
        assert!((call_price(100.0, 90.0, 0.0, 0.3, 0.04) - 10.0).abs() < 1e-12);
        assert_eq!(put_price(100.0, 90.0, 0.0, 0.3, 0.04), 0.0);
    }

    #[test]
    fn zero_volatility_is_intrinsic() {
        assert!((put_price(80.0, 100.0, 0.5, 0.0, 0.05) - 20.0).abs() < 1e-12);
        assert_eq!(call_price(80.0, 100.0, 0.5, 0.0, 0.05), 0.0);
    }

    #[test]
    fn at_the_money_call_matches_reference_value() {
        // S=100 K=100 T=1 vol=0.2 r=0.05
        let price = call_price(100.0, 100.0, 1.0, 0.2, 0.05);
        assert!((price - 10.450583572185565).abs() < 1e-6);
    }

    #[test]
    fn norm_cdf_is_symmetric() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((norm_cdf(1.3) + norm_cdf(-1.3) - 1.0).abs() < 1e-12);
    }
}
