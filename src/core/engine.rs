use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    config::RestorerConfig,
    core::audio::write_audio,
    error::{RestoreError, Result},
    types::{ChannelUnit, RestorationRequest},
};

/// What the collaborator reported when it exited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollaboratorOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CollaboratorOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// The external restoration model, as seen by the pipeline.
///
/// Implementations run one request to completion and report how the
/// collaborator exited; checking the output artifact is left to [`restore`].
pub trait Restorer {
    fn invoke(&self, request: &RestorationRequest) -> Result<CollaboratorOutput>;
}

impl<F> Restorer for F
where
    F: Fn(&RestorationRequest) -> Result<CollaboratorOutput>,
{
    fn invoke(&self, request: &RestorationRequest) -> Result<CollaboratorOutput> {
        self(request)
    }
}

/// Runs the restoration script as a child process.
pub struct CommandRestorer {
    config: RestorerConfig,
}

impl CommandRestorer {
    pub fn new(config: RestorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RestorerConfig {
        &self.config
    }

    fn command(&self, request: &RestorationRequest) -> Command {
        let flags = &self.config.flags;
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&flags.input)
            .arg(&request.input)
            .arg(&flags.output)
            .arg(&request.output)
            .arg(&flags.steps)
            .arg(request.steps.to_string())
            .arg(&flags.cutoff)
            .arg(request.cutoff_hz.to_string())
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Restorer for CommandRestorer {
    fn invoke(&self, request: &RestorationRequest) -> Result<CollaboratorOutput> {
        let mut cmd = self.command(request);
        debug!("Launching restorer: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| RestoreError::RestorationFailed {
            status: None,
            diagnostic: format!("failed to launch `{}`: {e}", self.config.program),
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait(&mut child, self.config.timeout())?;

        let output = CollaboratorOutput {
            success: status.success(),
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };

        debug!("Restorer stdout:\n{}", output.stdout);
        if !output.stderr.is_empty() {
            debug!("Restorer stderr:\n{}", output.stderr);
        }

        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            // Bytes read before the error are kept.
            if let Err(e) = pipe.read_to_end(&mut bytes) {
                warn!("Failed to read restorer output: {e}");
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            // Only the direct child is killed; processes it spawned keep running.
            if let Err(e) = child.kill() {
                warn!("Failed to kill timed-out restorer: {e}");
            }
            let _ = child.wait();
            return Err(RestoreError::RestorationTimedOut {
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Copies its input to the output path. Exercises the pipeline without a model.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughRestorer;

impl Restorer for PassthroughRestorer {
    fn invoke(&self, request: &RestorationRequest) -> Result<CollaboratorOutput> {
        fs::copy(&request.input, &request.output)?;
        Ok(CollaboratorOutput::ok())
    }
}

/// Serializes `unit` into `work_dir`, runs one restoration on it and returns
/// the restored file's path. No retries.
pub fn restore(
    restorer: &dyn Restorer,
    unit: &ChannelUnit,
    steps: u32,
    cutoff_hz: u32,
    work_dir: &Path,
    stem: &str,
) -> Result<PathBuf> {
    let input = work_dir.join(format!("{stem}_{}.wav", unit.tag));
    let output = work_dir.join(format!("{stem}_{}_restored.wav", unit.tag));

    write_audio(&input, &unit.audio)?;
    if output.exists() {
        fs::remove_file(&output)?;
    }

    let request = RestorationRequest {
        input,
        output,
        steps,
        cutoff_hz,
    };
    info!(
        "Restoring {} channel: steps={}, cutoff={} Hz",
        unit.tag, steps, cutoff_hz
    );

    let outcome = restorer.invoke(&request)?;
    if !outcome.success {
        return Err(RestoreError::RestorationFailed {
            status: outcome.code,
            diagnostic: outcome.diagnostic(),
        });
    }

    if !request.output.is_file() {
        return Err(RestoreError::MissingOutputArtifact {
            path: request.output,
        });
    }

    Ok(request.output)
}
