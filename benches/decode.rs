use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use scenelink::codec::{PacketDecoder, PacketEncoder};

fn mesh_payload() -> String {
    let vertices: Vec<String> = (0..40).map(|i| format!(r#"{{"X":{i},"Y":{},"Z":0}}"#, i * 2)).collect();
    format!(
        r#"{{"Items":[{{"Items":{{"Vertices":[{}],"Faces":[[0,1,2]]}},"Meta":{{}}}}],"Meta":{{}}}}"#,
        vertices.join(",")
    )
}

fn bench_decode(c: &mut Criterion) {
    let payload = mesh_payload();
    let plain = PacketEncoder::new().encode(&payload).unwrap();
    let compressed = PacketEncoder::new()
        .with_compression(true)
        .encode(&payload)
        .unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("plain", |b| {
        let mut decoder = PacketDecoder::new();
        b.iter(|| decoder.decode(black_box(&plain)).unwrap())
    });
    group.bench_function("gzip", |b| {
        let mut decoder = PacketDecoder::new();
        b.iter(|| decoder.decode(black_box(&compressed)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
