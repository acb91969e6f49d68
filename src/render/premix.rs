use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use crate::{
    audio::{mixer::write_wav, AudioLoader, Mixer},
    config::RenderConfig,
    error::{CompositorError, Result},
    render::{
        ffmpeg::AudioSource,
        process::FfmpegRenderer,
        traits::{Capabilities, RenderOutput, RenderRequest, Renderer},
    },
};

/// Mixes audio in-process, then hands video and the finished mix to ffmpeg
///
/// The mixdown is written as `premix.wav` in the job's work directory.
pub struct PremixRenderer {
    ffmpeg: FfmpegRenderer,
}

impl PremixRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            ffmpeg: FfmpegRenderer::new(config),
        }
    }
}

#[async_trait]
impl Renderer for PremixRenderer {
    fn name(&self) -> &str {
        "premix"
    }

    fn description(&self) -> &str {
        "Decode and mix audio in-process, then encode video with ffmpeg"
    }

    fn check_available(&self, capabilities: &Capabilities) -> Result<()> {
        capabilities.require_ffmpeg(self.name())
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutput> {
        let mix = request.plan.mix.clone();
        let sample_rate = request.plan.video.sample_rate;
        let channels = request.plan.video.channels;
        let wav_path = request.work_dir.join("premix.wav");
        let target = wav_path.clone();

        info!("🎚️ Premixing {} tracks", mix.tracks.len());
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut sources = HashMap::new();
            for track in &mix.tracks {
                sources.insert(track.track, AudioLoader::load(&track.source)?);
            }
            let mixed = Mixer::new(sample_rate, channels).mix(&mix, &sources)?;
            write_wav(&target, &mixed)
        })
        .await
        .map_err(|e| CompositorError::generic(format!("premix task failed: {}", e)))??;

        self.ffmpeg
            .execute(request, AudioSource::Premixed(&wav_path), self.name())
            .await
    }
}
