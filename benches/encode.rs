use criterion::{Criterion, black_box, criterion_group, criterion_main};
use quickcodes::render::render;
use quickcodes::{EncodeOptions, Symbology, encode, generate};

const URL: &[u8] = b"https://example.com/products/4006381333931?ref=bench";

fn bench_encode_matrix_symbologies(c: &mut Criterion) {
    let options = EncodeOptions::default();
    for symbology in [Symbology::QrCode, Symbology::DataMatrix, Symbology::Aztec, Symbology::Pdf417] {
        c.bench_function(&format!("encode_{symbology}_url"), |b| {
            b.iter(|| encode(black_box(symbology), black_box(URL), &options))
        });
    }
}

fn bench_encode_linear_symbologies(c: &mut Criterion) {
    let options = EncodeOptions::default();
    let cases: [(Symbology, &[u8]); 3] = [
        (Symbology::Ean13, b"400638133393"),
        (Symbology::Code128, b"SHIP-2024-000123"),
        (Symbology::Itf14, b"1234567890123"),
    ];
    for (symbology, payload) in cases {
        c.bench_function(&format!("encode_{symbology}"), |b| {
            b.iter(|| encode(black_box(symbology), black_box(payload), &options))
        });
    }
}

fn bench_encode_qr_large(c: &mut Criterion) {
    let payload = vec![b'A'; 2000];
    let options = EncodeOptions::default();
    c.bench_function("encode_qr_2000_alphanumeric", |b| {
        b.iter(|| encode(black_box(Symbology::QrCode), black_box(&payload), &options))
    });
}

fn bench_render(c: &mut Criterion) {
    let matrix = encode(Symbology::QrCode, URL, &EncodeOptions::default()).unwrap();
    c.bench_function("render_qr_scale_8", |b| {
        b.iter(|| render(black_box(&matrix), black_box(8), black_box(4)))
    });
}

fn bench_generate(c: &mut Criterion) {
    c.bench_function("generate_datamatrix_url", |b| {
        b.iter(|| generate(black_box(Symbology::DataMatrix), black_box(URL)))
    });
}

criterion_group!(
    benches,
    bench_encode_matrix_symbologies,
    bench_encode_linear_symbologies,
    bench_encode_qr_large,
    bench_render,
    bench_generate
);
criterion_main!(benches);
