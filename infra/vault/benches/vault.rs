use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fcrypt_vault::prelude::*;
use fcrypt_vault::{SecretKey, cipher};

fn bench_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("cipher");
    let key = SecretKey::generate();

    let sizes = [("32B", 32usize), ("1KB", 1024), ("16KB", 16 * 1024)];

    for (label, size) in sizes {
        let plaintext = "x".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", label), &plaintext, |b, p| {
            b.iter(|| cipher::encrypt(p, &key).unwrap());
        });

        let sealed = cipher::encrypt(&plaintext, &key).expect("encrypt failed");
        group.bench_with_input(BenchmarkId::new("decrypt", label), &sealed, |b, s| {
            b.iter(|| cipher::decrypt(s, &key).unwrap());
        });
    }

    group.finish();
}

fn bench_vault(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
    let mut group = c.benchmark_group("vault");

    for (label, wrap) in [("envelope", true), ("direct", false)] {
        let keyring = LocalKeyring::builder()
            .active("bench", &"42".repeat(32))
            .and_then(|b| b.wrap_data_keys(wrap).build())
            .expect("keyring");
        let vault = Vault::new(keyring);

        group.bench_function(BenchmarkId::new("seal", label), |b| {
            b.to_async(&runtime).iter(|| vault.seal("ya29.a0AfH6SMBx-oauth-access-token"));
        });

        let token = runtime.block_on(vault.seal("ya29.a0AfH6SMBx-oauth-access-token")).expect("seal");
        group.bench_function(BenchmarkId::new("open", label), |b| {
            b.to_async(&runtime).iter(|| vault.open(&token));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cipher, bench_vault);
criterion_main!(benches);
