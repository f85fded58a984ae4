//! Throughput of the message and key-exchange ciphers.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use roomseal_core::crypto::{key_exchange, message};
use roomseal_core::{RoomKey, UserKeypair};

fn bench_message_cipher(c: &mut Criterion) {
    let key = RoomKey::generate("bench-room").unwrap();
    let mut group = c.benchmark_group("message_cipher");

    for size in [64usize, 4 * 1024, 1024 * 1024] {
        let plaintext = vec![0x42u8; size];
        let payload = message::encrypt(&plaintext, &key).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, p| {
            b.iter(|| message::encrypt(black_box(p), &key).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decrypt", size), &payload, |b, p| {
            b.iter(|| message::decrypt(black_box(p), &key).unwrap())
        });
    }

    group.finish();
}

fn bench_key_exchange(c: &mut Criterion) {
    let alice = UserKeypair::generate().unwrap();
    let bob = UserKeypair::generate().unwrap();
    let grant = [0x11u8; 80];
    let envelope = key_exchange::seal(&grant, &bob.public_key(), &alice).unwrap();

    c.bench_function("key_exchange/seal", |b| {
        b.iter(|| key_exchange::seal(black_box(&grant), &bob.public_key(), &alice).unwrap())
    });
    c.bench_function("key_exchange/open", |b| {
        b.iter(|| key_exchange::open(black_box(&envelope), &alice.public_key(), &bob).unwrap())
    });
}

criterion_group!(benches, bench_message_cipher, bench_key_exchange);
criterion_main!(benches);
