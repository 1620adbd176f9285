use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Playback speed multiplier handed to the speed changer.
///
/// `Display` gives the natural decimal form used in file names (`2`, `0.25`,
/// `3.5`). [`SpeedFactor::tool_arg`] gives the two-decimal form the speed
/// changer is invoked with.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedFactor(f64);

impl SpeedFactor {
    /// Fastest speed the speed changer is asked for.
    pub const MAX: f64 = 20.0;

    pub fn new(value: f64) -> Self {
        SpeedFactor(value)
    }

    pub fn tool_arg(&self) -> String {
        format!("{:.2}", self.0)
    }

    /// A factor is usable when it survives two-decimal rounding as a
    /// positive value and stays within [`SpeedFactor::MAX`].
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && (self.0 * 100.0).round() > 0.0 && self.0 <= Self::MAX
    }
}

impl Display for SpeedFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for SpeedFactor {
    fn from(value: f64) -> Self {
        SpeedFactor(value)
    }
}

impl FromStr for SpeedFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(SpeedFactor(value)),
            _ => Err(format!("invalid speed factor {s:?}")),
        }
    }
}

/// Parse a comma separated list such as `2,3,4,2`.
pub fn parse_speed_list(s: &str) -> Result<Vec<SpeedFactor>, String> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(SpeedFactor::from_str)
        .collect()
}

/// Join factors in natural form, e.g. `2_3_4`.
pub fn join_speeds(speeds: &[SpeedFactor], separator: &str) -> String {
    speeds
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<String>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_form() {
        assert_eq!(SpeedFactor::new(2.0).to_string(), "2");
        assert_eq!(SpeedFactor::new(0.25).to_string(), "0.25");
        assert_eq!(SpeedFactor::new(3.5).to_string(), "3.5");
    }

    #[test]
    fn test_tool_arg_pads_to_two_decimals() {
        assert_eq!(SpeedFactor::new(0.25).tool_arg(), "0.25");
        assert_eq!(SpeedFactor::new(2.0).tool_arg(), "2.00");
        assert_eq!(SpeedFactor::new(0.5).tool_arg(), "0.50");
    }

    #[test]
    fn test_validity() {
        assert!(SpeedFactor::new(0.25).is_valid());
        assert!(SpeedFactor::new(6.0).is_valid());
        assert!(SpeedFactor::new(SpeedFactor::MAX).is_valid());
        assert!(!SpeedFactor::new(0.0).is_valid());
        assert!(!SpeedFactor::new(-1.0).is_valid());
        assert!(!SpeedFactor::new(0.004).is_valid());
        assert!(!SpeedFactor::new(25.0).is_valid());
        assert!(!SpeedFactor::new(f64::NAN).is_valid());
    }

    #[test]
    fn test_parse_speed_list() {
        let speeds = parse_speed_list("2, 3,0.25,2").unwrap();
        assert_eq!(speeds, vec![
            SpeedFactor::new(2.0),
            SpeedFactor::new(3.0),
            SpeedFactor::new(0.25),
            SpeedFactor::new(2.0),
        ]);
        assert!(parse_speed_list("2,fast").is_err());
        assert!(parse_speed_list("").unwrap().is_empty());
    }

    #[test]
    fn test_join_speeds() {
        let speeds = vec![SpeedFactor::new(2.0), SpeedFactor::new(3.0)];
        assert_eq!(join_speeds(&speeds, "_"), "2_3");
        assert_eq!(join_speeds(&speeds, ","), "2,3");
    }
}
