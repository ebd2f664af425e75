//! PM2.5 to AQI conversion.
//!
//! The Air Quality Index is a piecewise-linear function of concentration.
//! Each bracket maps a concentration range onto an AQI range:
//!
//! | PM2.5 (µg/m³) | AQI | Category |
//! |---------------|-----|----------|
//! | 0.0 - 12.0 | 0 - 50 | Good |
//! | 12.1 - 35.4 | 51 - 100 | Moderate |
//! | 35.5 - 55.4 | 101 - 150 | Unhealthy for Sensitive Groups |
//! | 55.5 - 150.4 | 151 - 200 | Unhealthy |
//! | 150.5 - 250.4 | 201 - 300 | Very Unhealthy |
//! | 250.5 - 500.4 | 301 - 500 | Hazardous |
//!
//! The brackets do not touch: a concentration that lands exactly on a lower
//! edge belongs to the higher bracket, and concentrations in the small gaps
//! between brackets (or above 500.4) are extrapolated along the slope of the
//! bracket below them rather than clamped.
//!
//! # Example
//!
//! ```
//! use airalert_core::{AqiCategory, calc_aqi};
//!
//! assert_eq!(calc_aqi(12.0), 50.0);
//! assert_eq!(calc_aqi(150.5), 201.0);
//! assert_eq!(AqiCategory::from_aqi(calc_aqi(41.0)), AqiCategory::UnhealthyForSensitiveGroups);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    conc_lo: f64,
    conc_hi: f64,
    aqi_lo: f64,
    aqi_hi: f64,
}

impl Breakpoint {
    const fn new(conc_lo: f64, conc_hi: f64, aqi_lo: f64, aqi_hi: f64) -> Self {
        Self {
            conc_lo,
            conc_hi,
            aqi_lo,
            aqi_hi,
        }
    }

    fn interpolate(&self, conc: f64) -> f64 {
        (self.aqi_hi - self.aqi_lo) * (conc - self.conc_lo) / (self.conc_hi - self.conc_lo)
            + self.aqi_lo
    }
}

// Ascending. Lookup walks this from the top down.
const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint::new(0.0, 12.0, 0.0, 50.0),
    Breakpoint::new(12.1, 35.4, 51.0, 100.0),
    Breakpoint::new(35.5, 55.4, 101.0, 150.0),
    Breakpoint::new(55.5, 150.4, 151.0, 200.0),
    Breakpoint::new(150.5, 250.4, 201.0, 300.0),
    Breakpoint::new(250.5, 500.4, 301.0, 500.0),
];

/// Calculate the AQI for a PM2.5 concentration.
///
/// Total over all finite inputs. Negative concentrations extrapolate through
/// the bottom bracket and concentrations above 500.4 through the top one.
pub fn calc_aqi(pm25: f64) -> f64 {
    let bracket = PM25_BREAKPOINTS
        .iter()
        .rev()
        .find(|bp| pm25 >= bp.conc_lo)
        .unwrap_or(&PM25_BREAKPOINTS[0]);
    bracket.interpolate(pm25)
}

/// AQI category, used to pick the level label in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    /// AQI 0-50.
    Good,
    /// AQI 51-100.
    Moderate,
    /// AQI 101-150.
    UnhealthyForSensitiveGroups,
    /// AQI 151-200.
    Unhealthy,
    /// AQI 201-300.
    VeryUnhealthy,
    /// AQI above 300.
    Hazardous,
}

impl AqiCategory {
    /// Classify an AQI value.
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiCategory::Good
        } else if aqi <= 100.0 {
            AqiCategory::Moderate
        } else if aqi <= 150.0 {
            AqiCategory::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiCategory::Unhealthy
        } else if aqi <= 300.0 {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    /// EPA name of the category.
    pub fn description(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_values() {
        assert_eq!(calc_aqi(0.0), 0.0);
        assert_eq!(calc_aqi(12.0), 50.0);
        assert_close(calc_aqi(35.4), 100.0);
        assert_close(calc_aqi(55.4), 150.0);
        assert_close(calc_aqi(150.4), 200.0);
        assert_close(calc_aqi(250.4), 300.0);
        assert_close(calc_aqi(500.4), 500.0);
    }

    #[test]
    fn test_lower_edges_select_higher_bracket() {
        assert_eq!(calc_aqi(12.1), 51.0);
        assert_eq!(calc_aqi(35.5), 101.0);
        assert_eq!(calc_aqi(55.5), 151.0);
        assert_eq!(calc_aqi(150.5), 201.0);
        assert_eq!(calc_aqi(250.5), 301.0);
    }

    #[test]
    fn test_gap_values_extrapolate_lower_bracket() {
        // 12.05 sits between the first two brackets.
        let aqi = calc_aqi(12.05);
        assert!(aqi > 50.0 && aqi < 51.0, "got {aqi}");
    }

    #[test]
    fn test_above_table_is_not_clamped() {
        let aqi = calc_aqi(600.0);
        assert!(aqi > 500.0);
        let slope = (500.0 - 301.0) / (500.4 - 250.5);
        assert!((aqi - (500.0 + slope * (600.0 - 500.4))).abs() < 1e-9);
    }

    #[test]
    fn test_negative_concentration_extrapolates() {
        assert!(calc_aqi(-1.0) < 0.0);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(AqiCategory::from_aqi(0.0), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(50.0), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(50.5), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(100.0), AqiCategory::Moderate);
        assert_eq!(
            AqiCategory::from_aqi(150.0),
            AqiCategory::UnhealthyForSensitiveGroups
        );
        assert_eq!(AqiCategory::from_aqi(200.0), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(300.0), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_aqi(300.1), AqiCategory::Hazardous);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(AqiCategory::VeryUnhealthy.to_string(), "Very Unhealthy");
        assert!(AqiCategory::Hazardous > AqiCategory::Good);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn in_bracket(index: usize) -> impl Strategy<Value = f64> {
            let bp = PM25_BREAKPOINTS[index];
            bp.conc_lo..=bp.conc_hi
        }

        proptest! {
            #[test]
            fn aqi_stays_in_bracket_range(index in 0usize..6, seed in 0.0f64..=1.0) {
                let bp = PM25_BREAKPOINTS[index];
                let conc = bp.conc_lo + (bp.conc_hi - bp.conc_lo) * seed;
                let aqi = calc_aqi(conc);
                prop_assert!(aqi >= bp.aqi_lo - 1e-9 && aqi <= bp.aqi_hi + 1e-9,
                    "pm25 {} gave {} outside {}..={}", conc, aqi, bp.aqi_lo, bp.aqi_hi);
            }

            #[test]
            fn aqi_is_monotonic_within_bracket(a in in_bracket(3), b in in_bracket(3)) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(calc_aqi(lo) <= calc_aqi(hi));
            }

            #[test]
            fn aqi_is_total(pm25 in -1000.0f64..10_000.0) {
                prop_assert!(calc_aqi(pm25).is_finite());
            }
        }
    }
}
