use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::{
    audio::{AudioTrackPlan, MixPlan, TrackKind},
    composition::CompositionPlan,
    error::{PlanValidationError, Result},
    video::{TransitionKind, VideoParams},
};

/// Where the output's audio comes from
#[derive(Debug, Clone, Copy)]
pub enum AudioSource<'a> {
    /// Mix the planned tracks inside the filter graph
    Plan(&'a MixPlan),
    /// A finished mixdown, copied into the container as is
    Premixed(&'a Path),
}

/// One ffmpeg invocation: the argument vector and, for logging, its filter graph
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    pub args: Vec<String>,
    pub filter_graph: String,
}

/// Translates a composition plan into ffmpeg arguments
#[derive(Debug, Clone, Default)]
pub struct FfmpegCommandBuilder {
    fonts_dir: Option<PathBuf>,
}

impl FfmpegCommandBuilder {
    pub fn new(fonts_dir: Option<PathBuf>) -> Self {
        Self { fonts_dir }
    }

    pub fn build(
        &self,
        plan: &CompositionPlan,
        audio: AudioSource<'_>,
        subtitles: Option<&Path>,
        output: &Path,
    ) -> Result<FfmpegCommand> {
        let timeline = &plan.timeline;
        if timeline.segments.is_empty() || timeline.transitions.len() + 1 != timeline.segments.len() {
            return Err(PlanValidationError::TimelineShape {
                segments: timeline.segments.len(),
                transitions: timeline.transitions.len(),
            }
            .into());
        }

        let video = &plan.video;
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "warning"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut graph = Vec::new();

        // ==========================================
        // INPUTS
        // ==========================================

        for segment in &timeline.segments {
            args.extend([
                "-ss".to_string(),
                secs(segment.in_point),
                "-t".to_string(),
                secs(segment.duration()),
                "-i".to_string(),
                path_arg(&segment.source_path),
            ]);
        }

        let first_audio = timeline.segments.len();
        match audio {
            AudioSource::Plan(mix) => {
                for track in &mix.tracks {
                    if track.track == TrackKind::Bgm && track.loop_count > 1 {
                        args.extend(["-stream_loop".to_string(), "-1".to_string()]);
                    }
                    args.extend(["-i".to_string(), path_arg(&track.source)]);
                }
            }
            AudioSource::Premixed(path) => args.extend(["-i".to_string(), path_arg(path)]),
        }

        // ==========================================
        // VIDEO CHAIN
        // ==========================================

        for (i, segment) in timeline.segments.iter().enumerate() {
            graph.push(format!("[{}:v]{}[v{}]", i, segment_filter(video, segment.duration()), i));
        }

        let offsets = timeline.segment_offsets();
        let mut current = "v0".to_string();
        for (i, transition) in timeline.transitions.iter().enumerate() {
            let next = i + 1;
            let joined = format!("j{}", next);
            match transition.kind {
                TransitionKind::Crossfade => graph.push(format!(
                    "[{}][v{}]xfade=transition=fade:duration={}:offset={}[{}]",
                    current,
                    next,
                    secs(transition.duration),
                    secs(offsets[next]),
                    joined
                )),
                TransitionKind::None => graph.push(format!(
                    "[{}][v{}]concat=n=2:v=1:a=0[{}]",
                    current, next, joined
                )),
            }
            current = joined;
        }

        let video_label = match subtitles {
            Some(path) => {
                let mut filter = format!("subtitles=filename='{}'", escape_filter_path(path));
                if let Some(fonts) = &self.fonts_dir {
                    let _ = write!(filter, ":fontsdir='{}'", escape_filter_path(fonts));
                }
                graph.push(format!("[{}]{}[vout]", current, filter));
                "[vout]".to_string()
            }
            None => format!("[{}]", current),
        };

        // ==========================================
        // AUDIO CHAIN
        // ==========================================

        let audio_label = match audio {
            AudioSource::Plan(mix) => {
                for (j, track) in mix.tracks.iter().enumerate() {
                    graph.push(format!(
                        "[{}:a]{}[a{}]",
                        first_audio + j,
                        track_filter(track, video),
                        j
                    ));
                }

                let inputs: String = (0..mix.tracks.len()).map(|j| format!("[a{}]", j)).collect();
                let mut mixdown = format!(
                    "{}amix=inputs={}:duration=longest:dropout_transition=0:normalize=0",
                    inputs,
                    mix.tracks.len()
                );
                if let Some(limiter) = mix.limiter {
                    let _ = write!(mixdown, ",alimiter=limit={:.3}:level=disabled", limiter.ceiling);
                }
                mixdown.push_str("[aout]");
                graph.push(mixdown);
                "[aout]".to_string()
            }
            AudioSource::Premixed(_) => format!("{}:a", first_audio),
        };

        // ==========================================
        // OUTPUT
        // ==========================================

        let filter_graph = graph.join(";");
        args.extend(["-filter_complex".to_string(), filter_graph.clone()]);
        args.extend(["-map".to_string(), video_label, "-map".to_string(), audio_label]);
        args.extend([
            "-c:v".to_string(),
            video.codec.clone(),
            "-preset".to_string(),
            video.preset.clone(),
            "-crf".to_string(),
            video.crf().to_string(),
            "-pix_fmt".to_string(),
            video.pixel_format.clone(),
            "-r".to_string(),
            format!("{}", video.fps),
            "-c:a".to_string(),
            video.audio_codec.clone(),
            "-b:a".to_string(),
            video.audio_bitrate.clone(),
            "-ar".to_string(),
            video.sample_rate.to_string(),
            "-ac".to_string(),
            video.channels.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-t".to_string(),
            secs(plan.output_duration()),
            "-y".to_string(),
            path_arg(output),
        ]);

        Ok(FfmpegCommand { args, filter_graph })
    }
}

/// Fill the frame (cropping the overflow), then conform rate and pixel format
fn segment_filter(video: &VideoParams, duration: f64) -> String {
    let (width, height) = video.resolution;
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps},format={pix},trim=duration={d},setpts=PTS-STARTPTS",
        w = width,
        h = height,
        fps = video.fps,
        pix = video.pixel_format,
        d = secs(duration),
    )
}

fn track_filter(track: &AudioTrackPlan, video: &VideoParams) -> String {
    let mut chain = vec![
        format!("atrim=start=0:duration={}", secs(track.play_duration)),
        "asetpts=PTS-STARTPTS".to_string(),
        format!("volume={:.3}", track.gain),
    ];

    if track.fade_in > 0.0 {
        chain.push(format!("afade=t=in:st=0:d={}", secs(track.fade_in)));
    }
    if track.fade_out > 0.0 {
        chain.push(format!(
            "afade=t=out:st={}:d={}",
            secs((track.play_duration - track.fade_out).max(0.0)),
            secs(track.fade_out)
        ));
    }

    let delay_ms = (track.start_offset * 1000.0).round() as u64;
    if delay_ms > 0 {
        chain.push(format!("adelay={}:all=1", delay_ms));
    }

    let layout = if video.channels == 1 { "mono" } else { "stereo" };
    chain.push(format!(
        "aresample={},aformat=sample_fmts=fltp:channel_layouts={}",
        video.sample_rate, layout
    ));

    chain.join(",")
}

fn secs(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Escape a path for use inside a single-quoted filter option value
///
/// The graph parser strips the quotes, then the option parser unescapes `\:`.
/// An apostrophe cannot appear inside the quotes: it closes them, is escaped
/// for both levels (`\\\'`), and the quotes reopen.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', r"'\\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioTrack, AudioMixPlanner, MixInputs, MixSettings};
    use crate::config::{AudioConfig, JobParams};
    use crate::video::{ClipSegment, Timeline, TransitionSpec};

    fn plan(transitions: Vec<TransitionSpec>, with_bgm: bool) -> CompositionPlan {
        let segments = vec![
            ClipSegment::new("/clips/a.mp4", 1.0, 3.0),
            ClipSegment::new("/clips/b.mp4", 0.0, 3.0),
            ClipSegment::new("/clips/c.mp4", 2.0, 2.0),
        ];
        let timeline = Timeline { segments, transitions };
        let duration = timeline.duration();

        let inputs = MixInputs {
            voiceover: AudioTrack::new(TrackKind::Voiceover, "/audio/voice.wav", duration),
            bgm: with_bgm.then(|| AudioTrack::new(TrackKind::Bgm, "/audio/bgm.mp3", 3.0)),
            cta: Some(AudioTrack::new(TrackKind::Cta, "/audio/cta.mp3", 2.0)),
        };
        let mix = AudioMixPlanner::new(MixSettings::new(&AudioConfig::default(), &JobParams::default()))
            .plan(&inputs, duration);

        CompositionPlan::new(VideoParams::default(), timeline, mix, None, duration, 0.05, 7)
    }

    #[test]
    fn test_crossfades_use_xfade_offsets() {
        let plan = plan(vec![TransitionSpec::crossfade(0.5), TransitionSpec::crossfade(0.5)], false);
        let cmd = FfmpegCommandBuilder::default()
            .build(&plan, AudioSource::Plan(&plan.mix), None, Path::new("/out/final.mp4"))
            .unwrap();

        assert!(cmd.filter_graph.contains("[v0][v1]xfade=transition=fade:duration=0.500:offset=2.500[j1]"));
        assert!(cmd.filter_graph.contains("[j1][v2]xfade=transition=fade:duration=0.500:offset=5.000[j2]"));
        assert!(cmd.args.contains(&"[j2]".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "/out/final.mp4");
    }

    #[test]
    fn test_cuts_use_concat() {
        let plan = plan(vec![TransitionSpec::cut(), TransitionSpec::cut()], false);
        let cmd = FfmpegCommandBuilder::default()
            .build(&plan, AudioSource::Plan(&plan.mix), None, Path::new("out.mp4"))
            .unwrap();

        assert!(!cmd.filter_graph.contains("xfade"));
        assert!(cmd.filter_graph.contains("[v0][v1]concat=n=2:v=1:a=0[j1]"));
    }

    #[test]
    fn test_audio_graph_places_tracks() {
        let plan = plan(vec![TransitionSpec::cut(), TransitionSpec::cut()], true);
        let cmd = FfmpegCommandBuilder::default()
            .build(&plan, AudioSource::Plan(&plan.mix), None, Path::new("out.mp4"))
            .unwrap();

        // bgm loops, cta is delayed to end with the 8s timeline
        assert!(cmd.args.windows(2).any(|w| w[0] == "-stream_loop" && w[1] == "-1"));
        assert!(cmd.filter_graph.contains("adelay=6000:all=1"));
        assert!(cmd.filter_graph.contains("amix=inputs=3:duration=longest:dropout_transition=0:normalize=0"));
        assert!(cmd.filter_graph.contains("alimiter=limit=0.950"));
        assert!(cmd.args.contains(&"[aout]".to_string()));
    }

    #[test]
    fn test_subtitles_and_premixed_audio() {
        let plan = plan(vec![TransitionSpec::cut(), TransitionSpec::cut()], false);
        let builder = FfmpegCommandBuilder::new(Some(PathBuf::from("/fonts")));
        let cmd = builder
            .build(
                &plan,
                AudioSource::Premixed(Path::new("/work/premix.wav")),
                Some(Path::new("/work/subtitles.ass")),
                Path::new("out.mp4"),
            )
            .unwrap();

        assert!(cmd.filter_graph.contains("[j2]subtitles=filename='/work/subtitles.ass':fontsdir='/fonts'[vout]"));
        assert!(!cmd.filter_graph.contains("amix"));
        assert!(cmd.args.contains(&"3:a".to_string()));
        assert!(cmd.args.contains(&"/work/premix.wav".to_string()));
    }

    #[test]
    fn test_malformed_timeline_rejected() {
        let plan = plan(vec![TransitionSpec::cut()], false);
        let result = FfmpegCommandBuilder::default().build(&plan, AudioSource::Plan(&plan.mix), None, Path::new("o.mp4"));
        assert!(result.is_err());
    }

    /// One level of ffmpeg tokenizing: quotes group, backslash escapes outside quotes
    fn unquote(value: &str) -> String {
        let mut out = String::new();
        let mut chars = value.chars();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => out.extend(chars.next()),
                c => out.push(c),
            }
        }
        out
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\subs\\it's.ass")), r"C\:/subs/it'\\\''s.ass");
        assert_eq!(escape_filter_path(Path::new("/work/subtitles.ass")), "/work/subtitles.ass");
    }

    #[test]
    fn test_escaped_path_survives_both_parsing_levels() {
        for path in ["C:\\subs\\it's.ass", "/tmp/a,b;[c]/don't stop: now.srt", "/work/plain.ass"] {
            let quoted = format!("'{}'", escape_filter_path(Path::new(path)));
            let option_value = unquote(&quoted);
            assert_eq!(unquote(&option_value), path.replace('\\', "/"), "via {}", quoted);
        }
    }
}
