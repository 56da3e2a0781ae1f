use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_core::props;
use trellis_text::{
    BreakStrategy, ImageSpanStyle, MeasureConstraint, ParagraphStyle, SpanStyle, TextLayoutJob,
    TextMeasurementEngine,
};

const WORDS: &str = "the quick brown fox jumps over the lazy dog ";

fn paragraph(repeat: usize, strategy: BreakStrategy) -> TextLayoutJob {
    let mut job = TextLayoutJob::new(ParagraphStyle {
        break_strategy: strategy,
        ..ParagraphStyle::default()
    });
    for i in 0..repeat {
        job.push_text(SpanStyle::default(), WORDS);
        if i % 4 == 0 {
            job.push_image(ImageSpanStyle::new(16.0, 16.0));
        }
    }
    job
}

fn bench_measure_short(c: &mut Criterion) {
    let engine = TextMeasurementEngine::new();
    let props = props! { "text" => "hello world", "fontSize" => 14.0 };
    c.bench_function("bench_measure_short", |b| {
        b.iter(|| {
            let result = engine.measure_node(black_box(&props), &[], &MeasureConstraint::at_most(200.0));
            black_box(result.height);
        });
    });
}

fn bench_measure_greedy(c: &mut Criterion) {
    let engine = TextMeasurementEngine::new();
    let job = paragraph(64, BreakStrategy::Greedy);
    c.bench_function("bench_measure_greedy", |b| {
        b.iter(|| {
            let result = engine.measure(black_box(&job), &MeasureConstraint::at_most(320.0));
            black_box(result.line_count);
        });
    });
}

fn bench_measure_balanced(c: &mut Criterion) {
    let engine = TextMeasurementEngine::new();
    let job = paragraph(64, BreakStrategy::Balanced);
    c.bench_function("bench_measure_balanced", |b| {
        b.iter(|| {
            let result = engine.measure(black_box(&job), &MeasureConstraint::at_most(320.0));
            black_box(result.line_count);
        });
    });
}

criterion_group!(
    benches,
    bench_measure_short,
    bench_measure_greedy,
    bench_measure_balanced
);
criterion_main!(benches);
