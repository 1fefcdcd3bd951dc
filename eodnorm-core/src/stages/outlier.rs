//! x100 scale-error correction.
//!
//! Some vendor feeds report a handful of days with prices off by a factor
//! of 100. Such a day shows up as a change of roughly +9900%, which the
//! detection band catches. Flagged rows have their price fields divided by
//! the scale and detection runs again, up to the iteration cap.

use super::change::calc_change;
use crate::config::OutlierConfig;
use crate::domain::row::checked_div;
use crate::domain::{CanonicalRow, Field};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result of the correction loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierOutcome {
    /// Nothing was flagged.
    Clean,
    /// Flagged rows were rescaled and detection converged.
    Corrected {
        iterations: usize,
        rows_rescaled: usize,
    },
    /// The iteration cap was reached with rows still flagged. The data is
    /// left as last corrected.
    Persistent {
        iterations: usize,
        rows_rescaled: usize,
        dates: Vec<NaiveDate>,
    },
}

impl OutlierOutcome {
    pub fn is_persistent(&self) -> bool {
        matches!(self, OutlierOutcome::Persistent { .. })
    }
}

pub struct OutlierCorrector<'a> {
    config: &'a OutlierConfig,
}

impl<'a> OutlierCorrector<'a> {
    pub fn new(config: &'a OutlierConfig) -> Self {
        Self { config }
    }

    /// Indices of rows whose change falls inside the anomaly band.
    pub fn detect(&self, rows: &[CanonicalRow], last_close: Option<f64>) -> Vec<usize> {
        calc_change(rows, last_close)
            .into_iter()
            .enumerate()
            .filter_map(|(i, change)| change.filter(|c| self.config.contains(*c)).map(|_| i))
            .collect()
    }

    /// Divide the price fields of the given rows by the scale.
    /// Volume and amount are left alone.
    fn rescale(&self, rows: &mut [CanonicalRow], flagged: &[usize]) {
        for &i in flagged {
            let row = &mut rows[i];
            for field in Field::SCALED_PRICES {
                let cell = row.get_mut(field);
                *cell = checked_div(*cell, Some(self.config.scale));
            }
        }
    }

    /// Run detection and correction until clean or the cap is reached.
    pub fn correct(
        &self,
        symbol: &str,
        rows: &mut [CanonicalRow],
        last_close: Option<f64>,
    ) -> OutlierOutcome {
        let mut rows_rescaled = 0;

        for iteration in 0..self.config.max_iterations {
            let flagged = self.detect(rows, last_close);
            if flagged.is_empty() {
                return if iteration == 0 {
                    OutlierOutcome::Clean
                } else {
                    OutlierOutcome::Corrected {
                        iterations: iteration,
                        rows_rescaled,
                    }
                };
            }
            debug!(symbol, iteration, flagged = flagged.len(), "rescaling anomalous rows");
            self.rescale(rows, &flagged);
            rows_rescaled += flagged.len();
        }

        let iterations = self.config.max_iterations;
        let remaining = self.detect(rows, last_close);
        if remaining.is_empty() {
            return OutlierOutcome::Corrected {
                iterations,
                rows_rescaled,
            };
        }

        let dates: Vec<NaiveDate> = remaining.iter().filter_map(|&i| rows[i].date).collect();
        warn!(
            symbol,
            iterations,
            remaining = remaining.len(),
            dates = ?dates,
            "change still abnormal after correction budget; check the data carefully"
        );
        OutlierOutcome::Persistent {
            iterations,
            rows_rescaled,
            dates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(closes: &[f64]) -> Vec<CanonicalRow> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| CanonicalRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 2 + i as u32),
                open: Some(close),
                high: Some(close * 1.01),
                low: Some(close * 0.99),
                close: Some(close),
                volume: Some(500.0),
                amount: Some(close * 500.0),
                adjclose: Some(close),
                ..CanonicalRow::default()
            })
            .collect()
    }

    #[test]
    fn clean_series_is_untouched() {
        let config = OutlierConfig::default();
        let mut data = rows(&[10.0, 10.5, 10.2]);
        let before = data.clone();
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);
        assert_eq!(outcome, OutlierOutcome::Clean);
        assert_eq!(data, before);
    }

    #[test]
    fn single_spike_is_restored_in_one_pass() {
        let config = OutlierConfig::default();
        let mut data = rows(&[10.0, 1000.0, 10.0]);
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);

        assert_eq!(
            outcome,
            OutlierOutcome::Corrected {
                iterations: 1,
                rows_rescaled: 1
            }
        );
        let spike = &data[1];
        assert!((spike.close.unwrap() - 10.0).abs() < 1e-9);
        assert!((spike.open.unwrap() - 10.0).abs() < 1e-9);
        assert!((spike.high.unwrap() - 10.1).abs() < 1e-9);
        assert!((spike.low.unwrap() - 9.9).abs() < 1e-9);
        assert!((spike.adjclose.unwrap() - 10.0).abs() < 1e-9);
        // volume and amount are not prices
        assert_eq!(spike.volume, Some(500.0));
        assert_eq!(spike.amount, Some(1000.0 * 500.0));
    }

    #[test]
    fn spike_against_seed_is_detected_on_first_row() {
        let config = OutlierConfig::default();
        let mut data = rows(&[1000.0, 1000.0]);
        let corrector = OutlierCorrector::new(&config);
        assert_eq!(corrector.detect(&data, Some(10.0)), vec![0]);
        let outcome = corrector.correct("T", &mut data, Some(10.0));
        // the second row now looks like the spike and is pulled down too
        assert!(matches!(outcome, OutlierOutcome::Corrected { iterations: 2, .. }));
        assert!((data[0].close.unwrap() - 10.0).abs() < 1e-9);
        assert!((data[1].close.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn persistent_anomaly_stops_at_cap() {
        let config = OutlierConfig {
            max_iterations: 1,
            ..OutlierConfig::default()
        };
        // two stacked x100 steps need two passes
        let mut data = rows(&[1.0, 100.0, 10_000.0]);
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);

        match outcome {
            OutlierOutcome::Persistent {
                iterations,
                rows_rescaled,
                dates,
            } => {
                assert_eq!(iterations, 1);
                assert_eq!(rows_rescaled, 2);
                assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()]);
            }
            other => panic!("expected persistent anomaly, got {other:?}"),
        }
        assert!((data[1].close.unwrap() - 1.0).abs() < 1e-9);
        assert!((data[2].close.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stacked_steps_converge_with_default_cap() {
        let config = OutlierConfig::default();
        let mut data = rows(&[1.0, 100.0, 10_000.0]);
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);
        assert_eq!(
            outcome,
            OutlierOutcome::Corrected {
                iterations: 2,
                rows_rescaled: 3
            }
        );
        for row in &data {
            assert!((row.close.unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn custom_band_is_respected() {
        let config = OutlierConfig {
            band_low: 9.0,
            band_high: 11.0,
            scale: 10.0,
            max_iterations: 10,
        };
        let mut data = rows(&[5.0, 50.0, 5.0]);
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);
        assert!(matches!(outcome, OutlierOutcome::Corrected { .. }));
        assert!((data[1].close.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn loop_always_terminates_within_cap() {
        let config = OutlierConfig::default();
        let mut data = rows(&[1.0, 100.0, 10_000.0, 1_000_000.0]);
        let outcome = OutlierCorrector::new(&config).correct("T", &mut data, None);
        let iterations = match outcome {
            OutlierOutcome::Clean => 0,
            OutlierOutcome::Corrected { iterations, .. }
            | OutlierOutcome::Persistent { iterations, .. } => iterations,
        };
        assert!(iterations <= config.max_iterations);
    }
}
