//! Benchmarks for the subtitle chain: normalization, segmentation and serialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shorts_composer::config::{LayoutConfig, SubtitleConfig};
use shorts_composer::subtitles::ass::AssStyles;
use shorts_composer::subtitles::{
    CueSegmenter, LayoutEngine, PlacedCue, SegmenterOptions, SubtitleFormat, SubtitleSerializer,
    TextCase, TimestampNormalizer, WordOrigin,
};
use shorts_composer::transcript::RawWord;

/// Recognizer-like output: short words, occasional pauses and sentence ends
fn generate_words(count: usize) -> Vec<RawWord> {
    let mut cursor = 0.0;
    (0..count)
        .map(|i| {
            let text = if i % 11 == 10 { format!("word{}.", i) } else { format!("word{}", i) };
            let start = cursor + if i % 7 == 0 { 0.4 } else { 0.02 };
            let end = start + 0.25;
            cursor = end;
            RawWord::new(text, start, end)
        })
        .collect()
}

fn bench_normalize_and_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_and_segment");
    let segmenter = CueSegmenter::new(SegmenterOptions::default());

    for count in [100, 1_000, 10_000] {
        let words = generate_words(count);
        let total = words.last().map(|w| w.end).unwrap_or(0.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &words, |b, words| {
            b.iter(|| {
                let normalized = TimestampNormalizer::default()
                    .normalize(black_box(words), total)
                    .unwrap();
                segmenter.segment(&normalized)
            })
        });
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let words = generate_words(1_000);
    let total = words.last().map(|w| w.end).unwrap_or(0.0);
    let normalized = TimestampNormalizer::default().normalize(&words, total).unwrap();
    let cues = CueSegmenter::new(SegmenterOptions::default()).segment(&normalized);

    let engine = LayoutEngine::new(LayoutConfig::default());
    let styles = AssStyles {
        voiceover: engine.base_layout(1080, 1920, WordOrigin::Voiceover).unwrap(),
        cta: engine.base_layout(1080, 1920, WordOrigin::Cta).unwrap(),
    };
    let placed: Vec<PlacedCue> = cues
        .into_iter()
        .map(|cue| PlacedCue::new(cue, TextCase::Upper, styles.voiceover.clone()))
        .collect();

    let mut group = c.benchmark_group("serialize");
    for format in [SubtitleFormat::Srt, SubtitleFormat::Ass] {
        let serializer = SubtitleSerializer::new(format, SubtitleConfig::default());
        group.bench_function(format.extension(), |b| {
            b.iter(|| serializer.serialize(black_box(&placed), &styles))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize_and_segment, bench_serialize);
criterion_main!(benches);
