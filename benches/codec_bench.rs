use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsonseal::crypto::{derive_key, KdfParams};
use jsonseal::{CipherProfile, EnvelopeCodec};

fn sample_document(records: usize) -> Vec<u8> {
    let items: Vec<String> = (0..records)
        .map(|i| format!(r#"{{"id":{i},"name":"item-{i}","tags":["a","b"],"price":{}.5}}"#, i % 100))
        .collect();
    format!("[{}]", items.join(",")).into_bytes()
}

fn bench_kdf(c: &mut Criterion) {
    let params = KdfParams::default();
    c.bench_function("scrypt_default_32b", |b| {
        b.iter(|| derive_key(black_box("bench secret"), 32, &params).unwrap())
    });
}

fn bench_encrypt(c: &mut Criterion) {
    // Fast KDF so the numbers reflect the cipher and encoding work.
    let codec = EnvelopeCodec::new(KdfParams::fast());
    let doc = sample_document(10_000);

    for profile in [CipherProfile::Aes256Cbc, CipherProfile::Aes256Gcm] {
        c.bench_function(&format!("encrypt_{}_{}kb", profile, doc.len() / 1024), |b| {
            b.iter(|| codec.encrypt(black_box(&doc), profile, "bench").unwrap())
        });
    }
}

fn bench_decrypt(c: &mut Criterion) {
    let codec = EnvelopeCodec::new(KdfParams::fast());
    let doc = sample_document(10_000);

    for profile in [CipherProfile::Aes256Cbc, CipherProfile::Aes256Gcm] {
        let envelope = codec.encrypt(&doc, profile, "bench").unwrap();
        c.bench_function(&format!("decrypt_{}_{}kb", profile, doc.len() / 1024), |b| {
            b.iter(|| codec.decrypt(black_box(&envelope), profile, "bench").unwrap())
        });
    }
}

criterion_group!(benches, bench_kdf, bench_encrypt, bench_decrypt);
criterion_main!(benches);
