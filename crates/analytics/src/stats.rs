use rust_decimal::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};

/// `None` for an empty slice or when the sum leaves the `Decimal` range.
pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum = values.iter().try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    sum.checked_div(Decimal::from(values.len()))
}

/// Sum of squared distances from `center`, `None` on overflow.
fn sum_of_squares<'a>(mut values: impl Iterator<Item = &'a Decimal>, center: Decimal) -> Option<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(center)?;
        acc.checked_add(d.checked_mul(d)?)
    })
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = sum_of_squares(values.iter(), m)?.checked_div(Decimal::from(values.len() - 1))?;
    variance.sqrt()
}

/// Root mean square of the returns that fall below `target`.
pub(crate) fn downside_deviation(values: &[Decimal], target: Decimal) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let squared = sum_of_squares(values.iter().filter(|v| **v < target), target)?;
    squared.checked_div(Decimal::from(values.len()))?.sqrt()
}

/// Mean excess return over volatility, scaled by `sqrt(periods_per_year)`.
pub(crate) fn annualised_ratio(
    returns: &[Decimal],
    per_period_rate: Decimal,
    deviation: Decimal,
    periods_per_year: u32,
) -> Option<Decimal> {
    if deviation <= Decimal::ZERO {
        return None;
    }
    let excess = mean(returns)?.checked_sub(per_period_rate)?;
    let scale = Decimal::from(periods_per_year).sqrt()?;
    excess.checked_div(deviation)?.checked_mul(scale)
}

/// Value at `quantile` (0..=1) of an ascending slice, nearest-rank.
pub(crate) fn quantile(sorted: &[Decimal], quantile: Decimal) -> Option<Decimal> {
    if sorted.is_empty() {
        return None;
    }
    let q = quantile.to_f64()?.clamp(0.0, 1.0);
    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted.get(rank.min(sorted.len() - 1)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sample_std_dev_matches_hand_computation() {
        // mean 5, squared deviations 9+1+1+9 = 20, / 3
        let sd = std_dev(&[dec!(2), dec!(4), dec!(6), dec!(8)]).unwrap();
        let expected = (dec!(20) / dec!(3)).sqrt().unwrap();
        assert_eq!(sd.round_dp(10), expected.round_dp(10));
        assert!(std_dev(&[dec!(1)]).is_none());
    }

    #[test]
    fn out_of_range_squares_are_undefined() {
        let big = Decimal::from_i128_with_scale(4 * 10_i128.pow(15), 0);
        let values = [big, -big, big, -big];
        assert_eq!(mean(&values), Some(Decimal::ZERO));
        assert!(std_dev(&values).is_none());
        assert!(downside_deviation(&values, Decimal::ZERO).is_none());
    }

    #[test]
    fn quantile_uses_nearest_rank() {
        let sorted: Vec<Decimal> = (0..=10).map(Decimal::from).collect();
        assert_eq!(quantile(&sorted, dec!(0.5)), Some(dec!(5)));
        assert_eq!(quantile(&sorted, dec!(0.0)), Some(dec!(0)));
        assert_eq!(quantile(&sorted, dec!(1)), Some(dec!(10)));
    }
}
