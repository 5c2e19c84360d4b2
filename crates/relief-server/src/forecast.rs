//! Demand forecasting collaborator seam.
//!
//! The core only consumes a quantity per resource type and an accuracy
//! figure; whatever model produces them lives behind this trait.

use relief_core::DemandEstimate;
use std::collections::BTreeMap;

pub trait DemandForecaster {
    /// Estimate demand per resource type over the given horizon.
    /// `accuracy` is the model's own confidence in 0.0..=1.0.
    fn estimate(
        &self,
        disaster_id: &str,
        resource_types: &[String],
        horizon_hours: u32,
    ) -> DemandEstimate;
}

/// Deterministic per-type base rates scaled by the horizon. Stands in for
/// an external forecasting service during development and tests.
pub struct BaselineForecaster {
    hourly_rates: BTreeMap<String, u32>,
    default_hourly_rate: u32,
    accuracy: f64,
}

impl Default for BaselineForecaster {
    fn default() -> Self {
        let mut hourly_rates = BTreeMap::new();
        hourly_rates.insert("water".to_string(), 40);
        hourly_rates.insert("food".to_string(), 25);
        hourly_rates.insert("medical".to_string(), 10);
        Self {
            hourly_rates,
            default_hourly_rate: 15,
            accuracy: 0.7,
        }
    }
}

impl DemandForecaster for BaselineForecaster {
    fn estimate(
        &self,
        _disaster_id: &str,
        resource_types: &[String],
        horizon_hours: u32,
    ) -> DemandEstimate {
        let quantities = resource_types
            .iter()
            .map(|resource_type| {
                let rate = self
                    .hourly_rates
                    .get(resource_type)
                    .copied()
                    .unwrap_or(self.default_hourly_rate);
                (resource_type.clone(), rate * horizon_hours)
            })
            .collect();

        DemandEstimate {
            quantities,
            accuracy: self.accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_with_horizon_and_reports_accuracy() {
        let forecaster = BaselineForecaster::default();
        let types = vec!["water".to_string(), "blankets".to_string()];

        let estimate = forecaster.estimate("D1", &types, 6);

        assert_eq!(estimate.quantities["water"], 240);
        assert_eq!(estimate.quantities["blankets"], 90);
        assert!((0.0..=1.0).contains(&estimate.accuracy));
    }

    #[test]
    fn is_deterministic() {
        let forecaster = BaselineForecaster::default();
        let types = vec!["water".to_string()];
        let a = forecaster.estimate("D1", &types, 12);
        let b = forecaster.estimate("D1", &types, 12);
        assert_eq!(a.quantities, b.quantities);
        assert_eq!(a.accuracy, b.accuracy);
    }
}
