//! Typed view over the `state` object pushed by the appliance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a scale is currently doing.
///
/// Online states carry the latest ADC reading (grams) in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum ScaleState {
    Offline,
    Standby {
        #[serde(default)]
        data: Option<f64>,
    },
    LiveMeasurement {
        #[serde(default)]
        data: Option<f64>,
    },
    Tare {
        #[serde(default)]
        data: Option<f64>,
    },
    Calibrate {
        #[serde(default)]
        data: Option<f64>,
        #[serde(rename = "knownMass", default)]
        known_mass: Option<f64>,
    },
    Recording {
        #[serde(rename = "isPaused", default)]
        is_paused: bool,
        /// Recorder output: tap entry, pour history and so on.
        #[serde(flatten)]
        recorder: Map<String, Value>,
    },
}

impl ScaleState {
    /// Decode a `state` object.
    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    pub fn is_online(&self) -> bool {
        !matches!(self, ScaleState::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_offline() {
        let state = ScaleState::from_value(&json!({ "name": "offline" })).unwrap();
        assert_eq!(state, ScaleState::Offline);
        assert!(!state.is_online());
    }

    #[test]
    fn decode_live_measurement() {
        let state =
            ScaleState::from_value(&json!({ "name": "liveMeasurement", "data": 4210 })).unwrap();
        assert_eq!(state, ScaleState::LiveMeasurement { data: Some(4210.0) });
        assert!(state.is_online());
    }

    #[test]
    fn decode_calibrate() {
        let state =
            ScaleState::from_value(&json!({ "name": "calibrate", "data": 1.0, "knownMass": 1000 }))
                .unwrap();
        assert_eq!(
            state,
            ScaleState::Calibrate {
                data: Some(1.0),
                known_mass: Some(1000.0)
            }
        );
    }

    #[test]
    fn decode_paused_recording_keeps_recorder_fields() {
        let state = ScaleState::from_value(&json!({
            "name": "recording",
            "isPaused": true,
            "tapEntry": { "name": "Tripel" },
            "data": [[1, 2]]
        }))
        .unwrap();
        let ScaleState::Recording {
            is_paused,
            recorder,
        } = state
        else {
            panic!("expected recording");
        };
        assert!(is_paused);
        assert_eq!(recorder["tapEntry"]["name"], "Tripel");
        assert!(recorder.contains_key("data"));
    }

    #[test]
    fn unknown_name_fails() {
        assert!(ScaleState::from_value(&json!({ "name": "dancing" })).is_err());
    }
}
