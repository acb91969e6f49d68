use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ClipConfig;
use crate::error::{ClipLibraryError, Result};
use crate::video::types::{ClipLibrary, VideoClip};

/// Builds a clip library from files on disk, probing durations with ffprobe
pub struct ClipScanner {
    ffprobe: String,
    extensions: Vec<String>,
    min_duration: f64,
}

impl ClipScanner {
    pub fn new<S: Into<String>>(ffprobe: S, config: &ClipConfig) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            extensions: config.extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            min_duration: config.min_clip_duration,
        }
    }

    /// Scan every path: directories are listed (non-recursively), files are taken as is
    pub fn scan(&self, paths: &[PathBuf]) -> Result<ClipLibrary> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(self.candidates(path)?);
            } else if path.is_file() {
                files.push(path.clone());
            } else {
                return Err(ClipLibraryError::DirectoryNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
        }

        Ok(self.probe_all(files))
    }

    /// Supported, non-hidden files of a directory in path order
    pub fn candidates(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        if !directory.is_dir() {
            return Err(ClipLibraryError::DirectoryNotFound {
                path: directory.display().to_string(),
            }
            .into());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.is_file() && !is_hidden(&path) && self.is_supported(&path) {
                files.push(path);
            }
        }

        files.sort();
        debug!("Found {} candidate clips in {:?}", files.len(), directory);
        Ok(files)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn probe_all(&self, files: Vec<PathBuf>) -> ClipLibrary {
        let clips: Vec<VideoClip> = files
            .par_iter()
            .filter_map(|path| match self.probe_duration(path) {
                Ok(duration) if duration >= self.min_duration => Some(VideoClip::new(path, duration)),
                Ok(duration) => {
                    debug!("Skipping {:?}: {:.2}s is below the minimum clip length", path, duration);
                    None
                }
                Err(e) => {
                    warn!("Could not load clip {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        info!("🎬 Loaded {} clips ({:.1}s of footage)", clips.len(), clips.iter().map(|c| c.duration).sum::<f64>());
        ClipLibrary::new(clips)
    }

    pub fn probe_duration(&self, path: &Path) -> std::result::Result<f64, ClipLibraryError> {
        let failed = |reason: String| ClipLibraryError::ProbeFailed {
            path: path.display().to_string(),
            reason,
        };

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(format!("could not run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| failed("no duration reported".to_string()))
    }
}

/// First positive finite number in ffprobe's `nokey` output
pub fn parse_probe_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scanner(ffprobe: &str) -> ClipScanner {
        ClipScanner::new(ffprobe, &ClipConfig::default())
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(parse_probe_duration("12.480000\n"), Some(12.48));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_candidates_filter_and_sort() {
        let dir = tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", ".hidden.mp4", "notes.txt", "c.webm"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let files = scanner("ffprobe").candidates(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4", "c.webm"]);
    }

    #[test]
    fn test_missing_directory() {
        let err = scanner("ffprobe").scan(&[PathBuf::from("/definitely/not/here")]).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unprobeable_clips_are_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"not a video").unwrap();

        let library = scanner("/nonexistent/ffprobe").scan(&[dir.path().to_path_buf()]).unwrap();
        assert!(library.is_empty());
    }
}
