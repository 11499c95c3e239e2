use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
    analysis::{Analyzer, SpectrogramAnalyzer},
    core::{
        audio::{read_audio, write_audio},
        dsp, engine,
        engine::Restorer,
        splitter,
    },
    error::{RestoreError, Result},
    io::progress::{NoProgress, ProgressSink, ProgressTracker},
    paths,
    types::{AudioData, ChannelTag, ChannelUnit, FilterSpec, RestoreOptions, RestoreResult},
};

/// Where a run currently is. Failures are reported against the stage they
/// happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Loaded,
    Splitting,
    Filtering(ChannelTag),
    Restoring(ChannelTag),
    Joining,
    Analyzing,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::Init => f.write_str("init"),
            RunStage::Loaded => f.write_str("loaded"),
            RunStage::Splitting => f.write_str("split"),
            RunStage::Filtering(tag) => write!(f, "filter:{tag}"),
            RunStage::Restoring(tag) => write!(f, "restore:{tag}"),
            RunStage::Joining => f.write_str("join"),
            RunStage::Analyzing => f.write_str("analyze"),
            RunStage::Done => f.write_str("done"),
        }
    }
}

const SPLIT_AT: f32 = 0.05;
const UNITS_FROM: f32 = 0.1;
const UNITS_TO: f32 = 0.9;
const WRITE_AT: f32 = 0.93;
const ANALYZE_AT: f32 = 0.95;

/// One end-to-end invocation over a single input file.
struct PipelineRun<'p> {
    id: Uuid,
    input: PathBuf,
    stem: String,
    stage: RunStage,
    progress: ProgressTracker<'p>,
}

impl<'p> PipelineRun<'p> {
    fn enter(&mut self, stage: RunStage, fraction: f32) {
        self.stage = stage;
        info!("[run {}] {}", self.id, stage);
        self.progress.report(fraction, &stage.to_string());
    }
}

/// Orchestrates split → filter → restore → join (→ analyze) for one file.
pub struct RestorePipeline {
    restorer: Box<dyn Restorer>,
    analyzer: Box<dyn Analyzer>,
    progress: Box<dyn ProgressSink>,
    tmp_root: PathBuf,
}

impl RestorePipeline {
    pub fn new(restorer: impl Restorer + 'static) -> Self {
        Self {
            restorer: Box::new(restorer),
            analyzer: Box::new(SpectrogramAnalyzer::default()),
            progress: Box::new(NoProgress),
            tmp_root: paths::tmp_dir(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    /// Parent directory for per-run scratch directories.
    pub fn with_tmp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_root = dir.into();
        self
    }

    pub fn run(&self, input: &Path, opts: &RestoreOptions) -> Result<RestoreResult> {
        validate(opts)?;

        let mut run = PipelineRun {
            id: Uuid::new_v4(),
            input: input.to_path_buf(),
            stem: paths::input_stem(input),
            stage: RunStage::Init,
            progress: ProgressTracker::new(self.progress.as_ref()),
        };
        info!(
            "[run {}] restoring {:?} (steps={}, cutoff={} Hz)",
            run.id, input, opts.steps, opts.cutoff_hz
        );

        match self.execute(&mut run, opts) {
            Ok(result) => {
                info!("[run {}] wrote {:?}", run.id, result.audio_path);
                Ok(result)
            }
            Err(e) => {
                warn!("[run {}] failed during {}: {}", run.id, run.stage, e);
                Err(e)
            }
        }
    }

    fn execute(&self, run: &mut PipelineRun<'_>, opts: &RestoreOptions) -> Result<RestoreResult> {
        run.progress.report(0.0, &RunStage::Init.to_string());
        let audio = read_audio(&run.input).map_err(|e| RestoreError::AudioLoad {
            path: run.input.clone(),
            reason: format!("{e:#}"),
        })?;
        run.stage = RunStage::Loaded;
        info!(
            "[run {}] loaded {} ch, {} Hz, {:.2}s",
            run.id,
            audio.channels,
            audio.sample_rate,
            audio.duration_secs()
        );

        run.enter(RunStage::Splitting, SPLIT_AT);
        let units = splitter::split(&audio)?;

        fs::create_dir_all(&self.tmp_root)?;
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("{}-{}-", run.stem, run.id))
            .tempdir_in(&self.tmp_root)?;

        let filter = FilterSpec {
            cutoff_hz: opts.cutoff_hz,
            order: opts.filter_order,
        };
        let count = units.len();
        let mut filtered_units = Vec::with_capacity(count);
        let mut restored_units = Vec::with_capacity(count);

        for (i, unit) in units.into_iter().enumerate() {
            let (start, end) = ProgressTracker::unit_range(i, count, UNITS_FROM, UNITS_TO);

            run.enter(RunStage::Filtering(unit.tag), start);
            let filtered = self.filter_unit(&unit, filter)?;
            let model_input = prepare_for_model(&filtered, opts.model_sample_rate)?;

            run.enter(RunStage::Restoring(unit.tag), (start + end) / 2.0);
            let restored_path = engine::restore(
                self.restorer.as_ref(),
                &model_input,
                opts.steps,
                opts.cutoff_hz,
                work_dir.path(),
                &run.stem,
            )?;
            let restored = read_audio(&restored_path).map_err(|e| RestoreError::AudioLoad {
                path: restored_path.clone(),
                reason: format!("{e:#}"),
            })?;

            restored_units.push(splitter::restored_unit(unit.tag, restored));
            if opts.compare {
                filtered_units.push(filtered);
            }
        }

        run.enter(RunStage::Joining, UNITS_TO);
        let joined = splitter::join(restored_units)?;

        run.progress.report(WRITE_AT, "write");
        fs::create_dir_all(&opts.output_dir)?;
        let audio_path = paths::restored_output_path(&opts.output_dir, &run.input);
        if audio_path.exists() {
            fs::remove_file(&audio_path)?;
        }
        write_audio(&audio_path, &joined)?;

        let mut comparison_path = None;
        let mut analysis_error = None;
        if opts.compare {
            run.enter(RunStage::Analyzing, ANALYZE_AT);
            match self.analyze(run, &work_dir, filtered_units, &audio_path) {
                Ok(path) => comparison_path = Some(path),
                Err(e) => {
                    let e = match e {
                        RestoreError::AnalysisFailed(_) => e,
                        other => RestoreError::AnalysisFailed(other.to_string()),
                    };
                    warn!("[run {}] {}", run.id, e);
                    analysis_error = Some(e.to_string());
                }
            }
        }

        run.enter(RunStage::Done, 1.0);

        Ok(RestoreResult {
            audio_path,
            comparison_path,
            analysis_error,
            channels: joined.channels,
            sample_rate: joined.sample_rate,
            frames: joined.frames(),
        })
    }

    fn filter_unit(&self, unit: &ChannelUnit, filter: FilterSpec) -> Result<ChannelUnit> {
        let samples = dsp::lowpass(
            &unit.audio.samples,
            filter,
            unit.audio.sample_rate,
            unit.audio.encoding,
        )?;
        Ok(ChannelUnit {
            tag: unit.tag,
            audio: AudioData {
                samples,
                ..unit.audio.clone()
            },
        })
    }

    fn analyze(
        &self,
        run: &PipelineRun<'_>,
        work_dir: &TempDir,
        filtered: Vec<ChannelUnit>,
        restored: &Path,
    ) -> Result<PathBuf> {
        let reference = splitter::join(filtered)?;
        let reference_path = work_dir.path().join(format!("{}_filtered.wav", run.stem));
        write_audio(&reference_path, &reference)?;
        self.analyzer.compare(&reference_path, restored)
    }
}

fn prepare_for_model(unit: &ChannelUnit, model_rate: Option<u32>) -> Result<ChannelUnit> {
    match model_rate {
        Some(rate) if rate != unit.audio.sample_rate => {
            let samples = dsp::resample(&unit.audio.samples, unit.audio.sample_rate, rate)?;
            Ok(ChannelUnit {
                tag: unit.tag,
                audio: AudioData {
                    samples,
                    sample_rate: rate,
                    ..unit.audio.clone()
                },
            })
        }
        _ => Ok(unit.clone()),
    }
}

fn validate(opts: &RestoreOptions) -> Result<()> {
    if !(RestoreOptions::MIN_STEPS..=RestoreOptions::MAX_STEPS).contains(&opts.steps) {
        return Err(RestoreError::InvalidParameter(format!(
            "steps must be within {}..={}, got {}",
            RestoreOptions::MIN_STEPS,
            RestoreOptions::MAX_STEPS,
            opts.steps
        )));
    }
    if opts.cutoff_hz == 0 {
        return Err(RestoreError::InvalidParameter(
            "cutoff frequency must be positive".into(),
        ));
    }
    if opts.filter_order == 0 {
        return Err(RestoreError::InvalidParameter(
            "filter order must be positive".into(),
        ));
    }
    if opts.model_sample_rate == Some(0) {
        return Err(RestoreError::InvalidParameter(
            "model sample rate must be positive".into(),
        ));
    }
    Ok(())
}

/// Restores one file with the given collaborator and no progress reporting.
pub fn restore_file(
    input: &Path,
    restorer: impl Restorer + 'static,
    opts: &RestoreOptions,
) -> Result<RestoreResult> {
    RestorePipeline::new(restorer).run(input, opts)
}
