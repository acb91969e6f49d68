use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    composition::CompositionPlan,
    config::RenderConfig,
    error::{BackendError, Result},
};

/// A media backend that turns a composition plan into an encoded video
///
/// Implementations receive a plan that has already passed validation and must
/// write the finished file to `request.output` only; the caller moves it into
/// place on success and discards it on failure.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the unique name of this renderer
    fn name(&self) -> &str;

    /// Returns a human-readable description of this renderer
    fn description(&self) -> &str;

    /// Check that the tools this renderer drives were found on this machine
    fn check_available(&self, capabilities: &Capabilities) -> Result<()> {
        let _ = capabilities;
        Ok(())
    }

    /// Execute the plan
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutput>;
}

/// Inputs of one backend invocation
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub plan: &'a CompositionPlan,
    /// Subtitle artifact written for this attempt, when subtitles are on
    pub subtitles: Option<&'a Path>,
    /// Scratch directory removed after the job, whatever the outcome
    pub work_dir: &'a Path,
    /// Temporary output path in the destination directory
    pub output: &'a Path,
}

/// What the backend reported
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    pub path: PathBuf,
    pub backend: String,
    pub elapsed: Duration,
    /// Tail of the backend's diagnostic output
    pub diagnostics: String,
}

/// Optional tools found at startup
///
/// Detected once and handed to the director so no component probes the
/// environment on its own.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Capabilities {
    /// First line of `ffmpeg -version`, when ffmpeg runs
    pub ffmpeg_version: Option<String>,
    pub ffprobe: bool,
    /// Filters reported by `ffmpeg -filters`
    pub filters: HashSet<String>,
}

impl Capabilities {
    pub async fn detect(config: &RenderConfig) -> Self {
        let ffmpeg_version = run_quiet(&config.ffmpeg_path, &["-hide_banner", "-version"])
            .await
            .and_then(|out| out.lines().next().map(|l| l.trim().to_string()));

        let ffprobe = run_quiet(&config.ffprobe_path, &["-hide_banner", "-version"]).await.is_some();

        let filters = if ffmpeg_version.is_some() {
            run_quiet(&config.ffmpeg_path, &["-hide_banner", "-filters"])
                .await
                .map(|out| parse_filter_list(&out))
                .unwrap_or_default()
        } else {
            HashSet::new()
        };

        let capabilities = Self {
            ffmpeg_version,
            ffprobe,
            filters,
        };

        match &capabilities.ffmpeg_version {
            Some(version) => debug!("Detected {} ({} filters)", version, capabilities.filters.len()),
            None => warn!("ffmpeg not found at '{}'", config.ffmpeg_path),
        }
        if !capabilities.ffprobe {
            warn!("ffprobe not found at '{}'", config.ffprobe_path);
        }

        capabilities
    }

    /// Everything present, for callers that know their environment
    pub fn assume_all() -> Self {
        Self {
            ffmpeg_version: Some("ffmpeg (assumed)".to_string()),
            ffprobe: true,
            filters: HashSet::new(),
        }
    }

    pub fn has_ffmpeg(&self) -> bool {
        self.ffmpeg_version.is_some()
    }

    /// True only when the filter list is known and lacks `name`
    pub fn filter_missing(&self, name: &str) -> bool {
        self.has_ffmpeg() && !self.filters.is_empty() && !self.filters.contains(name)
    }

    pub fn require_ffmpeg(&self, renderer: &str) -> Result<()> {
        if self.has_ffmpeg() {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                name: renderer.to_string(),
                reason: "ffmpeg was not found at startup".to_string(),
            }
            .into())
        }
    }
}

async fn run_quiet(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(Duration::from_secs(10), output).await {
        Ok(Ok(output)) if output.status.success() => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
        _ => None,
    }
}

/// Filter names from `ffmpeg -filters` output (` TSC xfade  VV->V  Cross fade ...`)
pub fn parse_filter_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            let io = fields.next()?;
            (flags.len() == 3 && io.contains("->")).then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_list() {
        let output = "Filters:\n  T.. = Timeline support\n  ---\n ..C xfade             VV->V      Cross fade one video with another.\n ... subtitles         V->V       Render text subtitles.\n TSC amix              N->A       Audio mixing.\n";
        let filters = parse_filter_list(output);
        assert!(filters.contains("xfade"));
        assert!(filters.contains("subtitles"));
        assert!(filters.contains("amix"));
        assert_eq!(filters.len(), 3);
    }

    #[test]
    fn test_filter_missing_only_when_known() {
        let mut caps = Capabilities::assume_all();
        assert!(!caps.filter_missing("xfade"));

        caps.filters.insert("amix".to_string());
        assert!(caps.filter_missing("xfade"));
        assert!(!caps.filter_missing("amix"));

        assert!(Capabilities::default().require_ffmpeg("ffmpeg").is_err());
        assert!(caps.require_ffmpeg("ffmpeg").is_ok());
    }

    #[tokio::test]
    async fn test_detect_without_tools() {
        let config = RenderConfig {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
            ..RenderConfig::default()
        };
        let caps = Capabilities::detect(&config).await;
        assert!(!caps.has_ffmpeg());
        assert!(!caps.ffprobe);
        assert!(caps.filters.is_empty());
    }
}
