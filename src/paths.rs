use std::{
    env,
    path::{Path, PathBuf},
};

/// Parent directory for per-run scratch directories.
pub fn tmp_dir() -> PathBuf {
    env::var("AUDIO_RESTORE_TMP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("audio-restore"))
}

pub fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("audio")
        .to_string()
}

/// `<output_dir>/<stem>_restored.wav`
pub fn restored_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_restored.wav", input_stem(input)))
}

/// `<dir>/<file stem>_comparison.png`, next to `restored`.
pub fn comparison_path(restored: &Path) -> PathBuf {
    let dir = restored.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}_comparison.png", input_stem(restored)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_input_stem() {
        let out = restored_output_path(Path::new("/out"), Path::new("/in/take 3.mp3"));
        assert_eq!(out, PathBuf::from("/out/take 3_restored.wav"));
        assert_eq!(
            comparison_path(&out),
            PathBuf::from("/out/take 3_restored_comparison.png")
        );
    }

    #[test]
    fn stem_falls_back_for_bare_paths() {
        assert_eq!(input_stem(Path::new("/")), "audio");
    }
}
