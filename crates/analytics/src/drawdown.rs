use crate::engine::AnalyticsEngine;
use crate::error::AnalyticsError;
use crate::report::{DrawdownAnalysis, DrawdownPeriod};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// A drawdown that has started but not yet recovered.
struct OpenDrawdown {
    peak_date: NaiveDateTime,
    peak_value: Decimal,
    trough_date: NaiveDateTime,
    trough_value: Decimal,
}

impl OpenDrawdown {
    fn close(
        self,
        recovery_date: Option<NaiveDateTime>,
        last_date: NaiveDateTime,
    ) -> Result<DrawdownPeriod, AnalyticsError> {
        let depth = depth(self.peak_value, self.trough_value)?;
        let depth_pct = (self.peak_value > Decimal::ZERO)
            .then(|| depth.checked_div(self.peak_value)?.checked_mul(Decimal::ONE_HUNDRED))
            .flatten();
        let end = recovery_date.unwrap_or(last_date);
        Ok(DrawdownPeriod {
            peak_date: self.peak_date,
            peak_value: self.peak_value,
            trough_date: self.trough_date,
            trough_value: self.trough_value,
            recovery_date,
            depth,
            depth_pct,
            duration_days: (end - self.peak_date).num_days(),
            recovery_days: recovery_date.map(|r| (r - self.trough_date).num_days()),
        })
    }
}

fn depth(peak: Decimal, value: Decimal) -> Result<Decimal, AnalyticsError> {
    peak.checked_sub(value).ok_or_else(|| {
        AnalyticsError::InvalidInput(format!("drawdown from {peak} to {value} is out of range"))
    })
}

impl AnalyticsEngine {
    /// Splits an equity series into peak-to-recovery drawdown periods.
    ///
    /// The series must be ordered by time. A period opens when the value
    /// drops below the running peak and closes the first time the value is
    /// back at or above that peak.
    pub fn drawdown_analysis(
        &self,
        equity: &[(NaiveDateTime, Decimal)],
    ) -> Result<DrawdownAnalysis, AnalyticsError> {
        if equity.len() < 2 {
            return Err(AnalyticsError::NotEnoughData(format!(
                "drawdown analysis needs at least 2 points, got {}",
                equity.len()
            )));
        }
        if equity.windows(2).any(|w| w[1].0 < w[0].0) {
            return Err(AnalyticsError::InvalidInput(
                "equity series is not ordered by time".to_string(),
            ));
        }

        let mut periods = Vec::new();
        let (mut peak_date, mut peak_value) = equity[0];
        let mut open: Option<OpenDrawdown> = None;

        for &(date, value) in &equity[1..] {
            if value >= peak_value {
                if let Some(dd) = open.take() {
                    periods.push(dd.close(Some(date), date)?);
                }
                peak_date = date;
                peak_value = value;
                continue;
            }

            match open.as_mut() {
                Some(dd) if value < dd.trough_value => {
                    dd.trough_date = date;
                    dd.trough_value = value;
                }
                Some(_) => {}
                None => {
                    open = Some(OpenDrawdown {
                        peak_date,
                        peak_value,
                        trough_date: date,
                        trough_value: value,
                    })
                }
            }
        }

        let (last_date, last_value) = equity[equity.len() - 1];
        if let Some(dd) = open {
            periods.push(dd.close(None, last_date)?);
        }

        let max_drawdown_details = periods.iter().max_by(|a, b| a.depth.cmp(&b.depth)).cloned();
        let longest_duration_days = periods.iter().map(|p| p.duration_days).max().unwrap_or(0);

        Ok(DrawdownAnalysis {
            max_drawdown_details,
            periods,
            current_drawdown: depth(peak_value, last_value)?,
            longest_duration_days,
        })
    }
}
