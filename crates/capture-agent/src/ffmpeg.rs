//! FFmpeg capture backend.
//!
//! One `ffmpeg` process is spawned per capture device listed in the recording
//! properties:
//!
//! - `capture.device.names`: comma-separated device names
//! - `capture.device.<name>.src`: input source (required)
//! - `capture.device.<name>.outputfile`: output file name (default `<name>.mkv`)
//! - `capture.device.<name>.format`: input format, passed as `-f`
//!
//! Output files are written to the recording directory. Stopping writes `q`
//! to each process, which makes ffmpeg finalize its output and exit.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use capture_core::{Properties, Recording};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::error::PipelineError;
use crate::pipeline::CaptureBackend;

/// Property listing the devices to capture.
pub const DEVICE_NAMES_PROPERTY: &str = "capture.device.names";

/// Command line for one capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    /// Device name.
    pub device: String,
    /// Arguments passed to ffmpeg.
    pub args: Vec<String>,
    /// File the device is captured to.
    pub output: PathBuf,
}

/// Build the ffmpeg command line for every device in `properties`.
///
/// # Errors
///
/// Returns `PipelineError::Configuration` if no devices are listed, a
/// device has no source, or an output file would land outside `directory`.
pub fn build_commands(
    properties: &Properties,
    directory: &Path,
) -> Result<Vec<DeviceCommand>, PipelineError> {
    let names: Vec<&str> = properties
        .get(DEVICE_NAMES_PROPERTY)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "{DEVICE_NAMES_PROPERTY} lists no devices"
        )));
    }

    names
        .into_iter()
        .map(|device| {
            let key = |suffix: &str| format!("capture.device.{device}.{suffix}");

            let src = properties.get(&key("src")).ok_or_else(|| {
                PipelineError::Configuration(format!("missing {}", key("src")))
            })?;
            let file = properties
                .get(&key("outputfile"))
                .cloned()
                .unwrap_or_else(|| format!("{device}.mkv"));
            // Outputs stay inside the recording directory.
            let relative = Path::new(&file);
            if file.is_empty()
                || !relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
            {
                return Err(PipelineError::Configuration(format!(
                    "{} must be a relative path inside the recording directory",
                    key("outputfile")
                )));
            }
            let output = directory.join(relative);

            let mut args = vec!["-nostats".to_string(), "-y".to_string()];
            if let Some(format) = properties.get(&key("format")) {
                args.push("-f".to_string());
                args.push(format.clone());
            }
            args.push("-i".to_string());
            args.push(src.clone());
            args.push(output.to_string_lossy().into_owned());

            Ok(DeviceCommand {
                device: device.to_string(),
                args,
                output,
            })
        })
        .collect()
}

/// Capture backend that drives `ffmpeg` processes.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: PathBuf,
}

impl FfmpegBackend {
    /// Create a backend using the given ffmpeg binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The ffmpeg binary in use.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

type DeviceExit = (String, std::io::Result<std::process::ExitStatus>);

fn check_exit(
    joined: Result<DeviceExit, tokio::task::JoinError>,
) -> Result<(), PipelineError> {
    let (device, status) = joined.map_err(|e| PipelineError::Aborted(e.to_string()))?;
    let status = status?;
    if status.success() {
        tracing::debug!(device = %device, "Capture process exited");
        Ok(())
    } else {
        Err(PipelineError::DeviceFailed {
            device,
            status: status.to_string(),
        })
    }
}

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    fn validate(&self, recording: &Recording) -> Result<(), PipelineError> {
        let directory = recording.directory.as_deref().ok_or_else(|| {
            PipelineError::Configuration("recording has no directory".to_string())
        })?;
        build_commands(&recording.properties, directory).map(|_| ())
    }

    async fn run(
        &self,
        recording: &Recording,
        mut stop: oneshot::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let directory = recording.directory.as_deref().ok_or_else(|| {
            PipelineError::Configuration("recording has no directory".to_string())
        })?;
        let commands = build_commands(&recording.properties, directory)?;

        let mut running = JoinSet::new();
        let mut inputs = Vec::with_capacity(commands.len());

        for command in commands {
            let mut child = Command::new(&self.binary)
                .args(&command.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| PipelineError::Spawn {
                    device: command.device.clone(),
                    message: e.to_string(),
                })?;

            tracing::info!(
                recording_id = %recording.id,
                device = %command.device,
                output = %command.output.display(),
                "Started capture process"
            );

            if let Some(stdin) = child.stdin.take() {
                inputs.push(stdin);
            }
            let device = command.device;
            running.spawn(async move { (device, child.wait().await) });
        }

        loop {
            tokio::select! {
                _ = &mut stop => break,
                next = running.join_next() => match next {
                    Some(joined) => check_exit(joined)?,
                    // Every device finished on its own.
                    None => return Ok(()),
                },
            }
        }

        for mut stdin in inputs {
            // A process that already exited has closed its stdin.
            if let Err(e) = stdin.write_all(b"q").await {
                tracing::debug!(error = %e, "Could not signal capture process");
            }
        }

        while let Some(joined) = running.join_next().await {
            check_exit(joined)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::{RecordingId, RecordingState};
    use chrono::Utc;
    use std::time::Duration;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn builds_one_command_per_device() {
        let properties = props(&[
            ("capture.device.names", "screen, camera"),
            ("capture.device.screen.src", ":0.0"),
            ("capture.device.screen.format", "x11grab"),
            ("capture.device.camera.src", "/dev/video0"),
            ("capture.device.camera.outputfile", "presenter.mp4"),
        ]);

        let commands = build_commands(&properties, Path::new("/captures/r1")).unwrap();
        assert_eq!(commands.len(), 2);

        let screen = &commands[0];
        assert_eq!(screen.device, "screen");
        assert_eq!(screen.output, PathBuf::from("/captures/r1/screen.mkv"));
        assert_eq!(
            screen.args,
            ["-nostats", "-y", "-f", "x11grab", "-i", ":0.0", "/captures/r1/screen.mkv"]
        );

        let camera = &commands[1];
        assert_eq!(camera.output, PathBuf::from("/captures/r1/presenter.mp4"));
        assert!(!camera.args.contains(&"-f".to_string()));
    }

    #[test]
    fn missing_devices_rejected() {
        let result = build_commands(&Properties::new(), Path::new("/tmp"));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));

        let blank = props(&[("capture.device.names", " , ")]);
        assert!(build_commands(&blank, Path::new("/tmp")).is_err());
    }

    #[test]
    fn missing_source_rejected() {
        let properties = props(&[("capture.device.names", "screen")]);
        let result = build_commands(&properties, Path::new("/tmp"));
        assert!(
            matches!(result, Err(PipelineError::Configuration(m)) if m.contains("capture.device.screen.src"))
        );
    }

    #[test]
    fn output_file_must_stay_in_directory() {
        for outputfile in ["/etc/passwd", "../escape.mkv", "nested/../../escape.mkv", ""] {
            let properties = props(&[
                ("capture.device.names", "screen"),
                ("capture.device.screen.src", ":0.0"),
                ("capture.device.screen.outputfile", outputfile),
            ]);
            let result = build_commands(&properties, Path::new("/captures/r1"));
            assert!(
                matches!(result, Err(PipelineError::Configuration(ref m)) if m.contains("outputfile")),
                "{outputfile:?} accepted"
            );
        }

        let properties = props(&[
            ("capture.device.names", "screen"),
            ("capture.device.screen.src", ":0.0"),
            ("capture.device.screen.outputfile", "tracks/screen.mkv"),
        ]);
        let commands = build_commands(&properties, Path::new("/captures/r1")).unwrap();
        assert_eq!(commands[0].output, PathBuf::from("/captures/r1/tracks/screen.mkv"));
    }

    #[test]
    fn validate_checks_configuration_without_spawning() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FfmpegBackend::new("/nonexistent/ffmpeg-binary");

        assert!(backend.validate(&recording(dir.path())).is_ok());

        let mut bad = recording(dir.path());
        bad.properties = Properties::new();
        assert!(matches!(
            backend.validate(&bad),
            Err(PipelineError::Configuration(_))
        ));

        let mut no_dir = recording(dir.path());
        no_dir.directory = None;
        assert!(backend.validate(&no_dir).is_err());
    }

    fn recording(dir: &Path) -> Recording {
        let mut recording = Recording::new(
            RecordingId::new("r1").unwrap(),
            RecordingState::Capturing,
            Utc::now(),
        );
        recording.directory = Some(dir.to_path_buf());
        recording.properties = props(&[
            ("capture.device.names", "screen"),
            ("capture.device.screen.src", ":0.0"),
        ]);
        recording
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FfmpegBackend::new("/nonexistent/ffmpeg-binary");
        let (_tx, rx) = oneshot::channel();

        let result = backend.run(&recording(dir.path()), rx).await;
        assert!(matches!(result, Err(PipelineError::Spawn { device, .. }) if device == "screen"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_process_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        // `false` ignores its arguments and exits with status 1.
        let backend = FfmpegBackend::new("false");
        let (_tx, rx) = oneshot::channel();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            backend.run(&recording(dir.path()), rx),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(PipelineError::DeviceFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_finishing_on_its_own_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        // `true` ignores its arguments and exits with status 0.
        let backend = FfmpegBackend::new("true");
        let (_tx, rx) = oneshot::channel();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            backend.run(&recording(dir.path()), rx),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }
}
