use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rexfilter::dedup::{ContentFingerprint, MinHasher, Shingler};

const PARAGRAPH: &str = "Die Gemeinde hat am Montag beschlossen, dass die neue Brücke über den Fluss \
    noch in diesem Jahr gebaut wird. Die Kosten werden von der Stadt und dem Land gemeinsam getragen, \
    wie der Sprecher der Verwaltung mitteilte. ";

fn document(nb_paragraphs: usize) -> String {
    PARAGRAPH.repeat(nb_paragraphs)
}

// signature computation for growing documents and permutation counts
fn signatures(c: &mut Criterion) {
    let mut group = c.benchmark_group("minhash signature");
    let shingler = Shingler::new(5);
    for num_perm in [64, 128, 256] {
        let minhasher = MinHasher::new(num_perm, 42);
        for nb_paragraphs in [1, 10, 100] {
            let text = document(nb_paragraphs);
            group.bench_with_input(
                BenchmarkId::new(format!("{num_perm} perms"), nb_paragraphs),
                &text,
                |b, text| b.iter(|| minhasher.signature(&shingler.shingles(black_box(text)))),
            );
        }
    }
    group.finish();
}

fn fingerprints(c: &mut Criterion) {
    let text = document(100);
    c.bench_function("sha256 fingerprint", |b| {
        b.iter(|| ContentFingerprint::of_text(black_box(&text)))
    });
}

criterion_group!(benches, signatures, fingerprints);
criterion_main!(benches);
