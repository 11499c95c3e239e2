//! # audio-restore-core
//!
//! Core pipeline for restoring bandwidth-limited audio: split a file into
//! mono channel units, low-pass them, hand each one to an external
//! restoration model, and join the results back into one output file.

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod types;

pub use crate::{
    analysis::{Analyzer, SpectrogramAnalyzer},
    config::{ArgFlags, RestorerConfig},
    core::{
        audio::{read_audio, write_audio},
        dsp::lowpass,
        engine::{restore, CollaboratorOutput, CommandRestorer, PassthroughRestorer, Restorer},
        splitter::{join, split},
    },
    error::{RestoreError, Result},
    io::progress::{NoProgress, ProgressSink},
    pipeline::{restore_file, RestorePipeline, RunStage},
    types::{
        AudioData, ChannelTag, ChannelUnit, FilterSpec, RestorationRequest, RestoreOptions,
        RestoreResult, SampleEncoding,
    },
};
