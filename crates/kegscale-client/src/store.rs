//! Latest known state of every scale, assembled from `data` pushes.

use kegscale_core::{ScaleData, ScaleState};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct ScaleStates {
    states: BTreeMap<usize, Value>,
}

impl ScaleStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a push. Full pushes replace the state; partial pushes merge into it.
    pub fn apply(&mut self, data: &ScaleData) {
        if !data.is_full
            && let Some(current) = self.states.get_mut(&data.index)
        {
            merge(current, &data.state);
            return;
        }
        self.states.insert(data.index, data.state.clone());
    }

    pub fn state(&self, index: usize) -> Option<&Value> {
        self.states.get(&index)
    }

    /// Decode the merged state. `None` if nothing was pushed for `index` yet.
    pub fn typed(&self, index: usize) -> Option<serde_json::Result<ScaleState>> {
        self.states.get(&index).map(ScaleState::from_value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.states.iter().map(|(index, state)| (*index, state))
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

/// Objects merge key by key, arrays are appended, anything else is replaced.
fn merge(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(update)) => target.extend(update.iter().cloned()),
        (target, update) => *target = update.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push(index: usize, is_full: bool, state: Value) -> ScaleData {
        serde_json::from_value(json!({ "index": index, "isFull": is_full, "state": state })).unwrap()
    }

    #[test]
    fn full_push_replaces() {
        let mut states = ScaleStates::new();
        states.apply(&push(0, true, json!({ "name": "liveMeasurement", "data": 10 })));
        states.apply(&push(0, true, json!({ "name": "offline" })));
        assert_eq!(states.state(0), Some(&json!({ "name": "offline" })));
        assert_eq!(states.typed(0).unwrap().unwrap(), ScaleState::Offline);
    }

    #[test]
    fn partial_push_merges() {
        let mut states = ScaleStates::new();
        states.apply(&push(
            1,
            true,
            json!({ "name": "recording", "isPaused": false, "data": 1000, "pours": [[1, 2]] }),
        ));
        states.apply(&push(1, false, json!({ "data": 980, "pours": [[3, 20]] })));
        assert_eq!(
            states.state(1),
            Some(&json!({
                "name": "recording",
                "isPaused": false,
                "data": 980,
                "pours": [[1, 2], [3, 20]]
            }))
        );
    }

    #[test]
    fn partial_push_without_base_is_kept() {
        let mut states = ScaleStates::new();
        states.apply(&push(2, false, json!({ "data": 5 })));
        assert_eq!(states.state(2), Some(&json!({ "data": 5 })));
        assert!(states.typed(2).unwrap().is_err());
        assert!(states.typed(3).is_none());
    }

    #[test]
    fn scales_are_independent() {
        let mut states = ScaleStates::new();
        states.apply(&push(0, true, json!({ "name": "standby", "data": 1 })));
        states.apply(&push(1, true, json!({ "name": "offline" })));
        states.apply(&push(0, false, json!({ "data": 2 })));
        let indices: Vec<_> = states.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(states.state(1), Some(&json!({ "name": "offline" })));
        assert_eq!(
            states.typed(0).unwrap().unwrap(),
            ScaleState::Standby { data: Some(2.0) }
        );
    }
}
