mod common;

use std::cell::RefCell;
use std::rc::Rc;

use audio_restore_core::{
    restore, split, AudioData, ChannelUnit, CollaboratorOutput, RestorationRequest, RestoreError,
    Result, SampleEncoding,
};
use tempfile::tempdir;

fn mono_unit() -> ChannelUnit {
    let audio = AudioData {
        samples: common::noise(2_000, 4),
        sample_rate: 16_000,
        channels: 1,
        encoding: SampleEncoding::Int16,
    };
    split(&audio).unwrap().remove(0)
}

#[test]
fn forwards_steps_and_cutoff_unchanged() {
    let dir = tempdir().unwrap();
    let seen = Rc::new(RefCell::new(None));
    let seen_in_stub = seen.clone();
    let stub = move |req: &RestorationRequest| -> Result<CollaboratorOutput> {
        *seen_in_stub.borrow_mut() = Some(req.clone());
        common::copy_stub(req)
    };

    let out = restore(&stub, &mono_unit(), 120, 3_500, dir.path(), "take").unwrap();

    let req = seen.borrow().clone().unwrap();
    assert_eq!(req.steps, 120);
    assert_eq!(req.cutoff_hz, 3_500);
    assert_eq!(req.input, dir.path().join("take_mono.wav"));
    assert_eq!(req.output, dir.path().join("take_mono_restored.wav"));
    assert_eq!(out, req.output);
    assert!(out.exists());
}

#[test]
fn non_zero_exit_carries_diagnostic() {
    let dir = tempdir().unwrap();
    let stub = |_: &RestorationRequest| -> Result<CollaboratorOutput> {
        Ok(CollaboratorOutput::failed(1, "CUDA error: OOM\n"))
    };

    match restore(&stub, &mono_unit(), 50, 4_000, dir.path(), "take") {
        Err(RestoreError::RestorationFailed { status, diagnostic }) => {
            assert_eq!(status, Some(1));
            assert!(diagnostic.contains("OOM"));
        }
        other => panic!("expected RestorationFailed, got {other:?}"),
    }
}

#[test]
fn falls_back_to_stdout_when_stderr_is_empty() {
    let dir = tempdir().unwrap();
    let stub = |_: &RestorationRequest| -> Result<CollaboratorOutput> {
        Ok(CollaboratorOutput {
            success: false,
            code: Some(2),
            stdout: "checkpoint not found".into(),
            stderr: String::new(),
        })
    };
    let err = restore(&stub, &mono_unit(), 50, 4_000, dir.path(), "take").unwrap_err();
    assert!(err.to_string().contains("checkpoint not found"));
}

#[test]
fn zero_exit_without_output_is_missing_artifact() {
    let dir = tempdir().unwrap();
    let stub = |_: &RestorationRequest| -> Result<CollaboratorOutput> { Ok(CollaboratorOutput::ok()) };

    match restore(&stub, &mono_unit(), 50, 4_000, dir.path(), "take") {
        Err(RestoreError::MissingOutputArtifact { path }) => {
            assert_eq!(path, dir.path().join("take_mono_restored.wav"));
        }
        other => panic!("expected MissingOutputArtifact, got {other:?}"),
    }
}

#[test]
fn stale_output_from_an_earlier_attempt_does_not_count() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("take_mono_restored.wav"), b"stale").unwrap();
    let stub = |_: &RestorationRequest| -> Result<CollaboratorOutput> { Ok(CollaboratorOutput::ok()) };

    assert!(matches!(
        restore(&stub, &mono_unit(), 50, 4_000, dir.path(), "take"),
        Err(RestoreError::MissingOutputArtifact { .. })
    ));
}

#[cfg(unix)]
mod command {
    use super::*;
    use audio_restore_core::{CommandRestorer, RestorerConfig};
    use std::{fs, path::Path, time::Instant};

    fn script(dir: &Path, body: &str) -> RestorerConfig {
        let path = dir.join("fake_model.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        RestorerConfig {
            program: "sh".into(),
            args: vec![path.to_string_lossy().into_owned()],
            ..RestorerConfig::default()
        }
    }

    #[test]
    fn runs_script_with_flags_cwd_and_env() {
        let dir = tempdir().unwrap();
        let model_dir = tempdir().unwrap();
        let mut cfg = script(
            dir.path(),
            r#"echo "$@" > "$4.args"
pwd > "$4.cwd"
echo "$RESTORE_MARKER" > "$4.env"
cp "$2" "$4""#,
        );
        cfg.working_dir = Some(model_dir.path().to_path_buf());
        cfg.env.insert("RESTORE_MARKER".into(), "a2sb".into());

        let out = restore(
            &CommandRestorer::new(cfg),
            &mono_unit(),
            70,
            6_000,
            dir.path(),
            "clip",
        )
        .unwrap();

        let args = fs::read_to_string(format!("{}.args", out.display())).unwrap();
        let input = dir.path().join("clip_mono.wav");
        assert_eq!(
            args.trim(),
            format!("-f {} -o {} -n 70 -c 6000", input.display(), out.display())
        );

        let cwd = fs::read_to_string(format!("{}.cwd", out.display())).unwrap();
        assert_eq!(
            fs::canonicalize(cwd.trim()).unwrap(),
            fs::canonicalize(model_dir.path()).unwrap()
        );
        let env = fs::read_to_string(format!("{}.env", out.display())).unwrap();
        assert_eq!(env.trim(), "a2sb");
        assert!(std::env::var("RESTORE_MARKER").is_err());
    }

    #[test]
    fn script_failure_surfaces_stderr() {
        let dir = tempdir().unwrap();
        let cfg = script(dir.path(), "echo 'RuntimeError: OOM' >&2\nexit 3");

        match restore(&CommandRestorer::new(cfg), &mono_unit(), 50, 4_000, dir.path(), "clip") {
            Err(RestoreError::RestorationFailed { status, diagnostic }) => {
                assert_eq!(status, Some(3));
                assert!(diagnostic.contains("OOM"));
            }
            other => panic!("expected RestorationFailed, got {other:?}"),
        }
    }

    #[test]
    fn script_that_writes_nothing_is_missing_artifact() {
        let dir = tempdir().unwrap();
        let cfg = script(dir.path(), "echo done\nexit 0");
        assert!(matches!(
            restore(&CommandRestorer::new(cfg), &mono_unit(), 50, 4_000, dir.path(), "clip"),
            Err(RestoreError::MissingOutputArtifact { .. })
        ));
    }

    #[test]
    fn missing_program_is_a_restoration_failure() {
        let dir = tempdir().unwrap();
        let cfg = RestorerConfig {
            program: "/nonexistent/restorer-binary".into(),
            args: vec![],
            ..RestorerConfig::default()
        };
        match restore(&CommandRestorer::new(cfg), &mono_unit(), 50, 4_000, dir.path(), "clip") {
            Err(RestoreError::RestorationFailed { status, diagnostic }) => {
                assert_eq!(status, None);
                assert!(diagnostic.contains("failed to launch"));
            }
            other => panic!("expected RestorationFailed, got {other:?}"),
        }
    }

    #[test]
    fn hung_script_is_killed_after_timeout() {
        let dir = tempdir().unwrap();
        let mut cfg = script(dir.path(), "exec sleep 30");
        cfg.timeout_secs = Some(1);

        let started = Instant::now();
        let err = restore(&CommandRestorer::new(cfg), &mono_unit(), 50, 4_000, dir.path(), "clip")
            .unwrap_err();
        assert!(matches!(err, RestoreError::RestorationTimedOut { secs: 1 }));
        assert!(started.elapsed().as_secs() < 10);
    }
}
