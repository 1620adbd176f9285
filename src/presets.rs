use serde::{Deserialize, Serialize};

use crate::speed::{join_speeds, SpeedFactor};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedPreset {
    pub label: String,
    pub speeds: Vec<SpeedFactor>,
}

impl SpeedPreset {
    pub fn new(speeds: &[f64]) -> Self {
        let speeds: Vec<SpeedFactor> = speeds.iter().map(|s| SpeedFactor::new(*s)).collect();
        SpeedPreset {
            label: join_speeds(&speeds, ","),
            speeds,
        }
    }
}

pub fn builtin_presets() -> Vec<SpeedPreset> {
    vec![
        SpeedPreset::new(&[2.0, 3.0, 4.0]),
        SpeedPreset::new(&[2.0, 3.0, 4.0, 2.0]),
        SpeedPreset::new(&[1.0, 2.0, 3.0, 4.0, 1.0]),
        SpeedPreset::new(&[2.0, 3.0, 4.0, 5.0]),
        SpeedPreset::new(&[2.0, 3.0, 4.0, 5.0, 2.0]),
        SpeedPreset::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 1.0]),
        SpeedPreset::new(&[2.0, 3.0, 4.0, 5.0, 6.0]),
        SpeedPreset::new(&[2.0, 3.0, 4.0, 5.0, 6.0, 2.0]),
        SpeedPreset::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0]),
        SpeedPreset::new(&[0.25]),
        SpeedPreset::new(&[0.5]),
        SpeedPreset::new(&[2.0]),
        SpeedPreset::new(&[3.0]),
        SpeedPreset::new(&[4.0]),
        SpeedPreset::new(&[5.0]),
        SpeedPreset::new(&[6.0]),
    ]
}
