use std::{
    path::{Path, PathBuf},
    process,
};

use audio_restore_core::{
    lowpass, read_audio, write_audio, AudioData, CommandRestorer, FilterSpec, PassthroughRestorer,
    RestoreError, RestoreOptions, RestorePipeline, RestorerConfig,
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

#[derive(Parser)]
#[command(name = "audio-restore")]
#[command(about = "Restore bandwidth-limited audio with an external neural model", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Low-pass, restore and rejoin one audio file
    Restore {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Sampling steps passed to the model (10-200)
        #[arg(short = 'n', long, default_value_t = 50)]
        steps: u32,

        /// Cutoff frequency in Hz
        #[arg(short, long, default_value_t = 4000)]
        cutoff: u32,

        #[arg(long, default_value_t = 10)]
        order: usize,

        /// Also render a before/after spectrogram PNG
        #[arg(long)]
        compare: bool,

        /// Resample each channel to this rate before restoration
        #[arg(long)]
        model_rate: Option<u32>,

        /// JSON file describing how to launch the restorer
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the model and pass the filtered audio through
        #[arg(long)]
        dry_run: bool,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Apply only the low-pass stage
    Lowpass {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        cutoff: u32,

        #[arg(long, default_value_t = 10)]
        order: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Restore {
            input,
            output,
            steps,
            cutoff,
            order,
            compare,
            model_rate,
            config,
            dry_run,
            quiet,
        } => {
            let opts = RestoreOptions {
                output_dir: output,
                steps,
                cutoff_hz: cutoff,
                filter_order: order,
                compare,
                model_sample_rate: model_rate,
            };
            handle_restore(&input, opts, config.as_deref(), dry_run, quiet)
        }
        Commands::Lowpass {
            input,
            output,
            cutoff,
            order,
        } => handle_lowpass(&input, &output, cutoff, order),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            process::exit(1);
        }
    }
}

fn handle_restore(
    input: &Path,
    opts: RestoreOptions,
    config: Option<&Path>,
    dry_run: bool,
    quiet: bool,
) -> Result<(), RestoreError> {
    if !input.exists() {
        return Err(RestoreError::AudioLoad {
            path: input.to_path_buf(),
            reason: "file not found".into(),
        });
    }

    let pipeline = if dry_run {
        RestorePipeline::new(PassthroughRestorer)
    } else {
        let cfg = match config {
            Some(path) => RestorerConfig::from_file(path)?,
            None => RestorerConfig::from_env()?,
        };
        info!("Restorer: {} {}", cfg.program, cfg.args.join(" "));
        RestorePipeline::new(CommandRestorer::new(cfg))
    };

    let pipeline = if quiet {
        pipeline
    } else {
        eprintln!("🎵 Audio Restore");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Input:  {}", input.display());
        eprintln!("Output: {}", opts.output_dir.display());
        eprintln!("Steps:  {}", opts.steps);
        eprintln!("Cutoff: {} Hz", opts.cutoff_hz);
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        pipeline.with_progress(|fraction: f32, stage: &str| {
            eprintln!("⏳ {:>3.0}% {}", fraction * 100.0, stage_name(stage));
        })
    };

    let result = pipeline.run(input, &opts)?;

    if quiet {
        println!("{}", result.audio_path.display());
        if let Some(p) = &result.comparison_path {
            println!("{}", p.display());
        }
        return Ok(());
    }

    eprintln!();
    eprintln!("✅ Restoration completed successfully!");
    eprintln!(
        "  🎧 Audio:      {} ({} ch, {} Hz, {} frames)",
        result.audio_path.display(),
        result.channels,
        result.sample_rate,
        result.frames
    );
    if let Some(p) = &result.comparison_path {
        eprintln!("  📈 Comparison: {}", p.display());
    }
    if let Some(e) = &result.analysis_error {
        eprintln!("  ⚠️  Comparison skipped: {}", e);
    }

    Ok(())
}

fn handle_lowpass(input: &Path, output: &Path, cutoff: u32, order: usize) -> Result<(), RestoreError> {
    let audio = read_audio(input).map_err(|e| RestoreError::AudioLoad {
        path: input.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    let spec = FilterSpec {
        cutoff_hz: cutoff,
        order,
    };
    let planes = audio_restore_core::core::splitter::deinterleave(&audio.samples, audio.channels);
    let mut filtered = Vec::with_capacity(planes.len());
    for plane in &planes {
        filtered.push(lowpass(plane, spec, audio.sample_rate, audio.encoding)?);
    }

    let mut samples = Vec::with_capacity(audio.samples.len());
    for i in 0..audio.frames() {
        samples.extend(filtered.iter().map(|plane| plane[i]));
    }

    write_audio(
        output,
        &AudioData {
            samples,
            ..audio
        },
    )?;
    eprintln!("✅ Wrote {}", output.display());
    Ok(())
}

fn stage_name(stage: &str) -> String {
    let (head, tag) = stage.split_once(':').unwrap_or((stage, ""));
    let name = match head {
        "init" => "Reading audio file",
        "split" => "Splitting channels",
        "filter" => "Low-pass filtering",
        "restore" => "Running restoration model",
        "join" => "Joining channels",
        "write" => "Writing output",
        "analyze" => "Rendering comparison",
        "done" => "Finished",
        other => other,
    };
    if tag.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({tag})")
    }
}
