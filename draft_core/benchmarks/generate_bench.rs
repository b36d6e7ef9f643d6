use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use draft_core::{DraftVariant, GenerationRequest, SliceGenerator};

fn bench_generate(c: &mut Criterion) {
    let generator = SliceGenerator::builtin();
    let mut group = c.benchmark_group("generate");

    for variant in DraftVariant::ALL {
        for players in [3usize, 6, 8] {
            group.bench_with_input(
                BenchmarkId::new(variant.as_str(), players),
                &players,
                |b, &players| {
                    let mut seed = 0u64;
                    b.iter(|| {
                        seed = seed.wrapping_add(1);
                        let request = GenerationRequest::new(variant, players).with_seed(seed);
                        generator.generate(&request).expect("bench generation")
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(generate_benches, bench_generate);
criterion_main!(generate_benches);
