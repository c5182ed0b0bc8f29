//! Outbound commands.
//!
//! Every command names an `action` and the `index` of the scale it targets.
//! Action-specific fields sit next to them in the same JSON object.

use serde::{Deserialize, Serialize};

/// A command addressed to one scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(flatten)]
    pub action: Action,
    pub index: usize,
}

impl Command {
    pub fn new(index: usize, action: Action) -> Self {
        Self { action, index }
    }

    /// Serialize to the text frame sent over the socket.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Domain actions understood by the appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    Standby,
    LiveMeasurement,
    Tare,
    Calibrate {
        /// Mass placed on the scale, in grams.
        #[serde(rename = "knownMass")]
        known_mass: f64,
    },
    StartRecording {
        #[serde(rename = "tapEntry")]
        tap_entry: TapEntry,
    },
    /// Resume a recording from a previously downloaded entry.
    PutRecordingEntry {
        #[serde(rename = "recordingEntry")]
        recording_entry: serde_json::Value,
    },
    PauseRecording,
    ContinueRecording,
    StopRecording,
}

impl Action {
    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Standby => "standby",
            Action::LiveMeasurement => "liveMeasurement",
            Action::Tare => "tare",
            Action::Calibrate { .. } => "calibrate",
            Action::StartRecording { .. } => "startRecording",
            Action::PutRecordingEntry { .. } => "putRecordingEntry",
            Action::PauseRecording => "pauseRecording",
            Action::ContinueRecording => "continueRecording",
            Action::StopRecording => "stopRecording",
        }
    }
}

/// A batch of beer being dispensed from a tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapEntry {
    pub id: String,
    pub number: u32,
    pub name: String,
    /// `YYYY-MM-DD`.
    pub bottling_date: String,
    /// Bottled volume in liters.
    #[serde(alias = "bottlingVolume")]
    pub bottling_size: f64,
    pub final_gravity: f64,
    pub abv: f64,
    pub srm: f64,
}
