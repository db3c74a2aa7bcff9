use crate::engine::AnalyticsEngine;
use crate::error::AnalyticsError;
use crate::report::{ConfidenceInterval, ConfidenceIntervals, KpiMetric};
use crate::stats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

impl AnalyticsEngine {
    /// Percentile bootstrap intervals for the requested metrics.
    ///
    /// Trade outcomes are resampled with replacement `bootstrap_iterations`
    /// times. Sharpe here is computed on raw trade PnL (no capital base),
    /// annualised like the headline ratio. Metrics that are undefined on too
    /// many resamples are left out of the result.
    pub fn bootstrap_intervals(
        &self,
        pnl: &[Decimal],
        metrics: &[KpiMetric],
    ) -> Result<ConfidenceIntervals, AnalyticsError> {
        if pnl.len() < 2 {
            return Err(AnalyticsError::NotEnoughData(format!(
                "bootstrap needs at least 2 observations, got {}",
                pnl.len()
            )));
        }
        let confidence = self.settings.confidence_level;
        if confidence <= Decimal::ZERO || confidence >= Decimal::ONE {
            return Err(AnalyticsError::InvalidInput(format!(
                "confidence level must be in (0, 1), got {confidence}"
            )));
        }

        let mut rng = match self.settings.bootstrap_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let iterations = self.settings.bootstrap_iterations.max(1);
        let mut samples: Vec<Vec<Decimal>> = vec![Vec::with_capacity(iterations); metrics.len()];
        let mut resample = vec![Decimal::ZERO; pnl.len()];

        for _ in 0..iterations {
            for slot in resample.iter_mut() {
                *slot = pnl[rng.gen_range(0..pnl.len())];
            }
            for (i, metric) in metrics.iter().enumerate() {
                if let Some(value) = self.statistic(*metric, &resample) {
                    samples[i].push(value);
                }
            }
        }

        let tail = (Decimal::ONE - confidence) / Decimal::TWO;
        let mut intervals = ConfidenceIntervals::new();
        for (metric, mut values) in metrics.iter().zip(samples) {
            // Require the statistic on at least half the resamples.
            if values.len() * 2 < iterations {
                tracing::debug!(metric = %metric, defined = values.len(), "Skipping CI: statistic mostly undefined.");
                continue;
            }
            values.sort();
            if let (Some(lower), Some(upper)) = (
                stats::quantile(&values, tail),
                stats::quantile(&values, Decimal::ONE - tail),
            ) {
                intervals.insert(*metric, ConfidenceInterval { lower, upper });
            }
        }

        Ok(intervals)
    }

    fn statistic(&self, metric: KpiMetric, sample: &[Decimal]) -> Option<Decimal> {
        match metric {
            KpiMetric::AvgTradePnl => stats::mean(sample),
            KpiMetric::WinRate => {
                let wins = sample.iter().filter(|v| **v > Decimal::ZERO).count();
                Some(Decimal::from(wins) / Decimal::from(sample.len()) * Decimal::ONE_HUNDRED)
            }
            KpiMetric::SharpeRatio => {
                let sd = stats::std_dev(sample)?;
                stats::annualised_ratio(sample, Decimal::ZERO, sd, self.settings.periods_per_year.max(1))
            }
            KpiMetric::ProfitFactor => {
                let (gains, losses) = sample.iter().try_fold((Decimal::ZERO, Decimal::ZERO), |(g, l), v| {
                    if *v > Decimal::ZERO {
                        Some((g.checked_add(*v)?, l))
                    } else {
                        Some((g, l.checked_add(v.abs())?))
                    }
                })?;
                (losses > Decimal::ZERO).then(|| gains.checked_div(losses)).flatten()
            }
        }
    }
}
