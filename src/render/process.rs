use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    config::RenderConfig,
    error::{BackendError, Result},
    render::{
        ffmpeg::{AudioSource, FfmpegCommandBuilder},
        traits::{Capabilities, RenderOutput, RenderRequest, Renderer},
    },
};

/// Lines of stderr kept for error reports
const DIAGNOSTIC_LINES: usize = 20;

/// Run an external program under a wall-clock limit
///
/// The child is killed when the limit passes. Returns the tail of its stderr
/// on success.
pub async fn run_backend(program: &str, args: &[String], timeout: Duration, backend: &str) -> Result<String> {
    debug!("Running {} with {} arguments", program, args.len());

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BackendError::Unavailable {
            name: backend.to_string(),
            reason: format!("could not start '{}': {}", program, e),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(BackendError::Timeout {
                backend: backend.to_string(),
                seconds: timeout.as_secs(),
            }
            .into())
        }
    };

    let diagnostics = stderr_tail(&output.stderr);
    if output.status.success() {
        Ok(diagnostics)
    } else {
        Err(BackendError::Execution {
            backend: backend.to_string(),
            status: output.status.to_string(),
            diagnostics,
        }
        .into())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..].join("\n")
}

/// Renders the whole plan with one ffmpeg filter graph
pub struct FfmpegRenderer {
    ffmpeg_path: String,
    timeout: Duration,
    builder: FfmpegCommandBuilder,
}

impl FfmpegRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            builder: FfmpegCommandBuilder::new(config.fonts_dir.clone()),
        }
    }

    /// Build and run the ffmpeg command for `request` with the given audio
    pub(crate) async fn execute(
        &self,
        request: &RenderRequest<'_>,
        audio: AudioSource<'_>,
        backend: &str,
    ) -> Result<RenderOutput> {
        let command = self.builder.build(request.plan, audio, request.subtitles, request.output)?;
        debug!("Filter graph: {}", command.filter_graph);

        let started = Instant::now();
        let diagnostics = run_backend(&self.ffmpeg_path, &command.args, self.timeout, backend).await?;
        let elapsed = started.elapsed();

        info!("🎞️ {} finished in {:.1}s", backend, elapsed.as_secs_f64());

        Ok(RenderOutput {
            path: PathBuf::from(request.output),
            backend: backend.to_string(),
            elapsed,
            diagnostics,
        })
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn description(&self) -> &str {
        "Single ffmpeg pass: clip trims, crossfades, subtitle burn-in and audio mix in one filter graph"
    }

    fn check_available(&self, capabilities: &Capabilities) -> Result<()> {
        capabilities.require_ffmpeg(self.name())
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutput> {
        self.execute(request, AudioSource::Plan(&request.plan.mix), self.name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompositorError;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let result = run_backend("/nonexistent/ffmpeg", &[], Duration::from_secs(1), "ffmpeg").await;
        assert!(matches!(
            result,
            Err(CompositorError::Backend(BackendError::Unavailable { .. }))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_backend() {
        let args = vec!["5".to_string()];
        let result = run_backend("sleep", &args, Duration::from_millis(100), "sleep").await;
        match result {
            Err(err @ CompositorError::Backend(BackendError::Timeout { .. })) => assert!(err.is_retryable()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_diagnostics() {
        let args = vec!["-c".to_string(), "echo broken graph >&2; exit 3".to_string()];
        match run_backend("sh", &args, Duration::from_secs(5), "sh").await {
            Err(CompositorError::Backend(BackendError::Execution { diagnostics, .. })) => {
                assert_eq!(diagnostics, "broken graph")
            }
            other => panic!("expected execution failure, got {:?}", other),
        }
    }

    #[test]
    fn test_requires_ffmpeg() {
        let renderer = FfmpegRenderer::new(&RenderConfig::default());
        assert!(renderer.check_available(&Capabilities::default()).is_err());
        assert!(renderer.check_available(&Capabilities::assume_all()).is_ok());
    }
}
