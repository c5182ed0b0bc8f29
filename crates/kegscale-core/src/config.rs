//! The appliance's static configuration document, served at `/config`.

use crate::ScaleDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceConfig {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub scales: Vec<ScaleConfig>,
    /// Reference weights available for tare and calibration.
    #[serde(default)]
    pub weights: Vec<Weight>,
}

/// Per-scale hardware configuration. Only the label matters to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub clock_pin: Option<u8>,
    #[serde(default)]
    pub data_pin: Option<u8>,
    #[serde(default)]
    pub gain: Option<u8>,
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weight {
    pub label: String,
    /// Grams.
    pub mass: f64,
    #[serde(default)]
    pub for_tare: bool,
    #[serde(default)]
    pub for_calibration: bool,
}

impl ApplianceConfig {
    /// One descriptor per configured scale, in appliance order.
    pub fn descriptors(&self) -> Vec<ScaleDescriptor> {
        self.scales
            .iter()
            .enumerate()
            .map(|(index, scale)| {
                let label = scale
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("Scale {index}"));
                ScaleDescriptor::new(index, label)
            })
            .collect()
    }

    /// Look up a calibration weight by label (case-insensitive).
    pub fn calibration_weight(&self, label: &str) -> Option<&Weight> {
        self.weights
            .iter()
            .filter(|w| w.for_calibration)
            .find(|w| w.label.eq_ignore_ascii_case(label))
    }
}
