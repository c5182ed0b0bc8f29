//! Per-scale facade.

use crate::pending::PendingResult;
use crate::scales::CommandSender;
use kegscale_core::{Action, Command, ScaleDescriptor, TapEntry};

/// One physical scale.
///
/// Every method queues a command on the connection shared by all scales of the
/// appliance and returns its [`PendingResult`]. Commands for different scales
/// are ordered relative to each other, since they travel over one socket.
#[derive(Clone)]
pub struct Scale {
    descriptor: ScaleDescriptor,
    commands: CommandSender,
}

impl Scale {
    pub fn new(descriptor: ScaleDescriptor, commands: CommandSender) -> Self {
        Self {
            descriptor,
            commands,
        }
    }

    pub fn index(&self) -> usize {
        self.descriptor.index
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn descriptor(&self) -> &ScaleDescriptor {
        &self.descriptor
    }

    pub fn standby(&self) -> PendingResult {
        self.send(Action::Standby)
    }

    pub fn live_measurement(&self) -> PendingResult {
        self.send(Action::LiveMeasurement)
    }

    pub fn tare(&self) -> PendingResult {
        self.send(Action::Tare)
    }

    /// Calibrate against a known mass in grams.
    pub fn calibrate(&self, known_mass: f64) -> PendingResult {
        self.send(Action::Calibrate { known_mass })
    }

    pub fn start_recording(&self, tap_entry: TapEntry) -> PendingResult {
        self.send(Action::StartRecording { tap_entry })
    }

    /// Resume recording from a previously downloaded recording.
    pub fn put_recording_entry(&self, recording_entry: serde_json::Value) -> PendingResult {
        self.send(Action::PutRecordingEntry { recording_entry })
    }

    pub fn pause_recording(&self) -> PendingResult {
        self.send(Action::PauseRecording)
    }

    pub fn continue_recording(&self) -> PendingResult {
        self.send(Action::ContinueRecording)
    }

    pub fn stop_recording(&self) -> PendingResult {
        self.send(Action::StopRecording)
    }

    fn send(&self, action: Action) -> PendingResult {
        self.commands.send(Command::new(self.descriptor.index, action))
    }
}

impl std::fmt::Debug for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scale")
            .field("index", &self.descriptor.index)
            .field("label", &self.descriptor.label)
            .finish()
    }
}
