use crate::Command;
use crate::config::Settings;
use anyhow::{Context, bail};
use kegscale_client::{Scale, ScaleStates, Scales, WebSocketTransport, fetch_config};
use kegscale_core::{ApplianceConfig, ScaleData, ScaleDescriptor, ScaleState, TapEntry};
use std::path::Path;
use tokio::sync::mpsc;

/// Calibration argument: a mass in grams or the label of a configured weight.
#[derive(Debug, PartialEq)]
enum KnownMass {
    Grams(f64),
    Weight(String),
}

impl KnownMass {
    fn parse(arg: &str) -> Self {
        match arg.trim().parse::<f64>() {
            Ok(grams) if grams.is_finite() => KnownMass::Grams(grams),
            _ => KnownMass::Weight(arg.trim().to_string()),
        }
    }

    fn grams(self, config: Option<&ApplianceConfig>) -> anyhow::Result<f64> {
        match self {
            KnownMass::Grams(grams) => Ok(grams),
            KnownMass::Weight(label) => config
                .and_then(|c| c.calibration_weight(&label))
                .map(|w| w.mass)
                .with_context(|| format!("no calibration weight labelled {label:?}")),
        }
    }
}

pub async fn run(settings: Settings, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scales => list(&settings).await,
        Command::Watch => watch(settings).await,
        other => single(settings, other).await,
    }
}

async fn list(settings: &Settings) -> anyhow::Result<()> {
    let config = fetch_config(&settings.endpoint)
        .await
        .context("fetching appliance config")?;
    if let Some(hostname) = &config.hostname {
        println!("{hostname}");
    }
    for scale in config.descriptors() {
        println!("  [{}] {}", scale.index, scale.label);
    }
    for weight in config.weights.iter().filter(|w| w.for_calibration) {
        println!("  weight {:?}: {} g", weight.label, weight.mass);
    }
    Ok(())
}

/// Scale labels from the config file, or from the appliance when none are configured.
async fn descriptors(
    settings: &Settings,
) -> anyhow::Result<(Vec<ScaleDescriptor>, Option<ApplianceConfig>)> {
    if !settings.scales.is_empty() {
        return Ok((settings.scales.clone(), None));
    }
    let config = fetch_config(&settings.endpoint)
        .await
        .context("fetching appliance config")?;
    Ok((config.descriptors(), Some(config)))
}

fn connect(
    settings: &Settings,
    scales: Vec<ScaleDescriptor>,
    on_data: impl FnMut(ScaleData) + Send + 'static,
) -> Scales {
    let transport =
        WebSocketTransport::with_policy(settings.endpoint.scales_url(), settings.reconnect.clone());
    Scales::with_options(transport, scales, on_data, settings.options.clone())
}

fn scale(scales: &Scales, index: usize) -> anyhow::Result<&Scale> {
    match scales.scale(index) {
        Some(scale) => Ok(scale),
        None => bail!("no scale {index} (appliance has {})", scales.instances().len()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn single(settings: Settings, command: Command) -> anyhow::Result<()> {
    let (descriptors, mut config) = descriptors(&settings).await?;
    let scales = connect(&settings, descriptors, |data| {
        tracing::debug!(index = data.index, full = data.is_full, "state push");
    });

    let (index, pending) = match command {
        Command::Standby { index } => (index, scale(&scales, index)?.standby()),
        Command::Live { index } => (index, scale(&scales, index)?.live_measurement()),
        Command::Tare { index } => (index, scale(&scales, index)?.tare()),
        Command::Calibrate { index, known } => {
            let known = KnownMass::parse(&known);
            if matches!(known, KnownMass::Weight(_)) && config.is_none() {
                config = Some(fetch_config(&settings.endpoint).await?);
            }
            let grams = known.grams(config.as_ref())?;
            (index, scale(&scales, index)?.calibrate(grams))
        }
        Command::StartRecording { index, tap_entry } => {
            let entry: TapEntry = read_json(&tap_entry)?;
            (index, scale(&scales, index)?.start_recording(entry))
        }
        Command::PutRecording { index, recording } => {
            let entry: serde_json::Value = read_json(&recording)?;
            (index, scale(&scales, index)?.put_recording_entry(entry))
        }
        Command::Pause { index } => (index, scale(&scales, index)?.pause_recording()),
        Command::Continue { index } => (index, scale(&scales, index)?.continue_recording()),
        Command::Stop { index } => (index, scale(&scales, index)?.stop_recording()),
        Command::Scales | Command::Watch => bail!("not a scale command"),
    };

    scales.open();
    let result = pending.await;
    scales.shutdown().await;

    result.with_context(|| format!("scale {index}"))?;
    println!("ok");
    Ok(())
}

async fn watch(settings: Settings) -> anyhow::Result<()> {
    let (descriptors, _) = descriptors(&settings).await?;
    let labels = descriptors.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scales = connect(&settings, descriptors, move |data| {
        let _ = tx.send(data);
    });
    scales.open();

    let mut states = ScaleStates::new();
    loop {
        tokio::select! {
            Some(data) = rx.recv() => {
                states.apply(&data);
                let label = labels
                    .get(data.index)
                    .map(|d| d.label.as_str())
                    .unwrap_or("?");
                println!("[{}] {label}: {}", data.index, summary(&states, data.index));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scales.shutdown().await;
    Ok(())
}

fn summary(states: &ScaleStates, index: usize) -> String {
    let reading = |data: Option<f64>| data.map(|g| format!(" {g:.1} g")).unwrap_or_default();
    match states.typed(index) {
        Some(Ok(ScaleState::Offline)) => "offline".to_string(),
        Some(Ok(ScaleState::Standby { data })) => format!("standby{}", reading(data)),
        Some(Ok(ScaleState::LiveMeasurement { data })) => format!("live{}", reading(data)),
        Some(Ok(ScaleState::Tare { data })) => format!("tare{}", reading(data)),
        Some(Ok(ScaleState::Calibrate { data, known_mass })) => match known_mass {
            Some(mass) => format!("calibrate {mass} g{}", reading(data)),
            None => format!("calibrate{}", reading(data)),
        },
        Some(Ok(ScaleState::Recording { is_paused, .. })) => {
            if is_paused {
                "recording (paused)".to_string()
            } else {
                "recording".to_string()
            }
        }
        Some(Err(_)) | None => states
            .state(index)
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}
