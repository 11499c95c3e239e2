use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{RestoreError, Result};

/// Flag names the restoration script expects for each argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgFlags {
    pub input: String,
    pub output: String,
    pub steps: String,
    pub cutoff: String,
}

impl Default for ArgFlags {
    fn default() -> Self {
        Self {
            input: "-f".into(),
            output: "-o".into(),
            steps: "-n".into(),
            cutoff: "-c".into(),
        }
    }
}

/// How to launch the restoration collaborator. Working directory and
/// environment apply to the child process only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorerConfig {
    pub program: String,
    /// Leading arguments, typically the model script.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
    pub flags: ArgFlags,
}

impl Default for RestorerConfig {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: vec!["A2SB_upsample_api.py".into()],
            working_dir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
            flags: ArgFlags::default(),
        }
    }
}

impl RestorerConfig {
    /// Defaults overridden by `AUDIO_RESTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// JSON file, then environment overrides on top.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| RestoreError::Config(format!("cannot read {:?}: {e}", path)))?;
        let mut cfg: Self = serde_json::from_str(&raw)?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(program) = env::var("AUDIO_RESTORE_PROGRAM") {
            self.program = program;
        }
        if let Ok(script) = env::var("AUDIO_RESTORE_SCRIPT") {
            self.args = vec![script];
        }
        if let Ok(dir) = env::var("AUDIO_RESTORE_WORKDIR") {
            self.working_dir = Some(PathBuf::from(dir));
        }
        if let Ok(pythonpath) = env::var("AUDIO_RESTORE_PYTHONPATH") {
            self.env.insert("PYTHONPATH".into(), pythonpath);
        }
        if let Ok(secs) = env::var("AUDIO_RESTORE_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                RestoreError::Config(format!("AUDIO_RESTORE_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
