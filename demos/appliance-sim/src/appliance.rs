//! Simulated scales and the state machine driven by commands.

use kegscale_core::{Action, Command, ScaleData, ScaleState};
use serde_json::{Map, Value, json};

/// Grams drawn from a keg per tick while a recording runs.
const POUR_PER_TICK: f64 = 25.0;

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Standby,
    LiveMeasurement,
    Tare,
    Calibrate { known_mass: f64 },
    Recording { paused: bool, recorder: Map<String, Value> },
}

#[derive(Debug)]
struct SimScale {
    /// Uncalibrated load cell reading.
    raw: f64,
    offset: f64,
    factor: f64,
    mode: Mode,
}

impl SimScale {
    fn new(index: usize) -> Self {
        Self {
            raw: 19_000.0 + 2_500.0 * index as f64,
            offset: 0.0,
            factor: 0.98,
            mode: Mode::Standby,
        }
    }

    fn reading(&self) -> f64 {
        (self.raw - self.offset) * self.factor
    }

    fn state(&self) -> ScaleState {
        let data = Some(self.reading());
        match &self.mode {
            Mode::Standby => ScaleState::Standby { data },
            Mode::LiveMeasurement => ScaleState::LiveMeasurement { data },
            Mode::Tare => ScaleState::Tare { data },
            Mode::Calibrate { known_mass } => ScaleState::Calibrate {
                data,
                known_mass: Some(*known_mass),
            },
            Mode::Recording { paused, recorder } => {
                let mut recorder = recorder.clone();
                recorder.insert("data".into(), json!(self.reading()));
                ScaleState::Recording {
                    is_paused: *paused,
                    recorder,
                }
            }
        }
    }

    fn full(&self, index: usize) -> ScaleData {
        let mut extra = Map::new();
        extra.insert(
            "adc".into(),
            json!({ "raw": self.raw, "offset": self.offset, "factor": self.factor }),
        );
        ScaleData {
            index,
            is_full: true,
            state: serde_json::to_value(self.state()).unwrap_or_default(),
            extra,
        }
    }

    fn partial(&self, index: usize) -> ScaleData {
        ScaleData {
            index,
            is_full: false,
            state: json!({ "data": self.reading() }),
            extra: Map::new(),
        }
    }

    fn apply(&mut self, index: usize, action: Action) -> Result<(), String> {
        self.mode = match (action, &self.mode) {
            (Action::Standby, _) => Mode::Standby,
            (Action::LiveMeasurement, _) => Mode::LiveMeasurement,
            (Action::Tare, _) => Mode::Tare,
            (Action::Calibrate { known_mass }, _) => {
                if !(known_mass.is_finite() && known_mass > 0.0) {
                    return Err("knownMass must be positive".into());
                }
                Mode::Calibrate { known_mass }
            }
            (Action::StartRecording { tap_entry }, _) => {
                let mut recorder = Map::new();
                recorder.insert("tapEntry".into(), json!(tap_entry));
                recorder.insert("pours".into(), json!([]));
                Mode::Recording {
                    paused: false,
                    recorder,
                }
            }
            (Action::PutRecordingEntry { recording_entry }, _) => match recording_entry {
                Value::Object(recorder) => Mode::Recording {
                    paused: false,
                    recorder,
                },
                _ => return Err("recordingEntry must be an object".into()),
            },
            (Action::PauseRecording, Mode::Recording { recorder, .. }) => Mode::Recording {
                paused: true,
                recorder: recorder.clone(),
            },
            (Action::ContinueRecording, Mode::Recording { recorder, .. }) => Mode::Recording {
                paused: false,
                recorder: recorder.clone(),
            },
            (Action::StopRecording, Mode::Recording { .. }) => Mode::Standby,
            (Action::PauseRecording | Action::ContinueRecording | Action::StopRecording, _) => {
                return Err(format!("scale {index} is not recording"));
            }
        };
        Ok(())
    }

    /// Advance one tick. Returns the push to send, if any.
    fn tick(&mut self, index: usize) -> Option<ScaleData> {
        match self.mode.clone() {
            Mode::Tare => {
                self.offset = self.raw;
                self.mode = Mode::LiveMeasurement;
                Some(self.full(index))
            }
            Mode::Calibrate { known_mass } => {
                let net = self.raw - self.offset;
                if net > 1.0 {
                    self.factor = known_mass / net;
                }
                self.mode = Mode::LiveMeasurement;
                Some(self.full(index))
            }
            Mode::LiveMeasurement => Some(self.partial(index)),
            Mode::Recording { paused: false, .. } => {
                self.raw = (self.raw - POUR_PER_TICK).max(self.offset);
                Some(self.partial(index))
            }
            Mode::Recording { paused: true, .. } | Mode::Standby => None,
        }
    }
}

/// A keg scale appliance with a fixed number of scales.
#[derive(Debug)]
pub struct Appliance {
    scales: Vec<SimScale>,
}

impl Appliance {
    pub fn new(count: usize) -> Self {
        Self {
            scales: (0..count).map(SimScale::new).collect(),
        }
    }

    /// Full state of every scale, sent to each new connection.
    pub fn snapshot(&self) -> Vec<ScaleData> {
        self.scales
            .iter()
            .enumerate()
            .map(|(index, scale)| scale.full(index))
            .collect()
    }

    /// Execute one command frame. On success the new full state of the
    /// addressed scale is returned for broadcasting.
    pub fn handle(&mut self, text: &str) -> Result<ScaleData, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
        if value.get("action").and_then(Value::as_str).is_none() {
            return Err("missing action".into());
        }
        if value.get("index").and_then(Value::as_u64).is_none() {
            return Err("missing index".into());
        }
        let command: Command =
            serde_json::from_value(value).map_err(|e| format!("invalid command: {e}"))?;

        let index = command.index;
        let scale = self
            .scales
            .get_mut(index)
            .ok_or_else(|| format!("scale {index} does not exist"))?;
        scale.apply(index, command.action)?;
        Ok(scale.full(index))
    }

    pub fn tick(&mut self) -> Vec<ScaleData> {
        self.scales
            .iter_mut()
            .enumerate()
            .filter_map(|(index, scale)| scale.tick(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(data: &ScaleData) -> &str {
        data.state["name"].as_str().unwrap()
    }

    #[test]
    fn snapshot_covers_every_scale() {
        let appliance = Appliance::new(2);
        let snapshot = appliance.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|d| d.is_full && name(d) == "standby"));
        assert!(snapshot[1].extra.contains_key("adc"));
    }

    #[test]
    fn rejects_invalid_commands() {
        let mut appliance = Appliance::new(1);
        assert_eq!(appliance.handle("nope").unwrap_err().split(':').next(), Some("invalid JSON"));
        assert_eq!(appliance.handle(r#"{"index":0}"#).unwrap_err(), "missing action");
        assert_eq!(appliance.handle(r#"{"action":"tare"}"#).unwrap_err(), "missing index");
        assert_eq!(
            appliance.handle(r#"{"action":"tare","index":3}"#).unwrap_err(),
            "scale 3 does not exist"
        );
        assert!(
            appliance
                .handle(r#"{"action":"explode","index":0}"#)
                .unwrap_err()
                .starts_with("invalid command")
        );
        assert_eq!(
            appliance
                .handle(r#"{"action":"calibrate","index":0,"knownMass":0}"#)
                .unwrap_err(),
            "knownMass must be positive"
        );
        assert_eq!(
            appliance.handle(r#"{"action":"pauseRecording","index":0}"#).unwrap_err(),
            "scale 0 is not recording"
        );
    }

    #[test]
    fn tare_settles_into_live_measurement() {
        let mut appliance = Appliance::new(1);
        let data = appliance.handle(r#"{"action":"tare","index":0}"#).unwrap();
        assert_eq!(name(&data), "tare");

        let pushes = appliance.tick();
        assert_eq!(pushes.len(), 1);
        assert_eq!(name(&pushes[0]), "liveMeasurement");
        assert_eq!(pushes[0].state["data"], json!(0.0));

        let pushes = appliance.tick();
        assert!(!pushes[0].is_full);
        assert_eq!(pushes[0].state, json!({ "data": 0.0 }));
    }

    #[test]
    fn calibrate_matches_known_mass() {
        let mut appliance = Appliance::new(1);
        appliance
            .handle(r#"{"action":"calibrate","index":0,"knownMass":19000}"#)
            .unwrap();
        let pushes = appliance.tick();
        assert_eq!(name(&pushes[0]), "liveMeasurement");
        let reading = pushes[0].state["data"].as_f64().unwrap();
        assert!((reading - 19_000.0).abs() < 1e-6);
    }

    #[test]
    fn recording_lifecycle() {
        let mut appliance = Appliance::new(1);
        let start = json!({
            "action": "startRecording",
            "index": 0,
            "tapEntry": {
                "id": "abc", "number": 3, "name": "Stout",
                "bottlingDate": "2023-01-10", "bottlingSize": 19.0,
                "finalGravity": 1012.0, "abv": 6.1, "srm": 40.0
            }
        });
        let data = appliance.handle(&start.to_string()).unwrap();
        assert_eq!(name(&data), "recording");
        assert_eq!(data.state["isPaused"], json!(false));
        assert_eq!(data.state["tapEntry"]["name"], "Stout");

        let before = data.state["data"].as_f64().unwrap();
        let pushes = appliance.tick();
        assert!(pushes[0].state["data"].as_f64().unwrap() < before);

        let data = appliance.handle(r#"{"action":"pauseRecording","index":0}"#).unwrap();
        assert_eq!(data.state["isPaused"], json!(true));
        assert!(appliance.tick().is_empty());

        appliance.handle(r#"{"action":"continueRecording","index":0}"#).unwrap();
        let data = appliance.handle(r#"{"action":"stopRecording","index":0}"#).unwrap();
        assert_eq!(name(&data), "standby");
    }

    #[test]
    fn put_recording_entry_resumes() {
        let mut appliance = Appliance::new(1);
        let put = json!({
            "action": "putRecordingEntry",
            "index": 0,
            "recordingEntry": { "pours": [{ "volume": 0.4 }] }
        });
        let data = appliance.handle(&put.to_string()).unwrap();
        assert_eq!(name(&data), "recording");
        assert_eq!(data.state["pours"][0]["volume"], json!(0.4));
    }
}
