use criterion::{criterion_group, criterion_main, Criterion};

use gifcheck::{validate, Config, TRAILER};

/// A looping animation of `frames` 64x64 frames, written by the `gif` crate.
fn animation(frames: u8) -> Vec<u8> {
    let palette: Vec<u8> = (0..=255u8).flat_map(|i| [i, i, i]).collect();
    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, 64, 64, &palette).unwrap();
        encoder.set_repeat(gif::Repeat::Infinite).unwrap();
        for i in 0..frames {
            let pixels: Vec<u8> = (0..64 * 64).map(|p| (p as u8).wrapping_add(i)).collect();
            let mut frame = gif::Frame::from_indexed_pixels(64, 64, &pixels, None);
            frame.delay = 4;
            encoder.write_frame(&frame).unwrap();
        }
    }
    out
}

/// Forge the introducer of every graphic control extension after the first.
fn forge(mut data: Vec<u8>) -> Vec<u8> {
    let positions: Vec<usize> = data
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w.starts_with(&[0x21, 0xf9, 0x04]))
        .map(|(i, _)| i)
        .skip(1)
        .collect();
    for i in positions {
        data[i] = TRAILER;
    }
    data
}

fn validator_benchmarks(c: &mut Criterion) {
    let clean = animation(32);
    let forged = forge(clean.clone());

    c.bench_function("validate_clean", |b| {
        let config = Config::default();
        b.iter(|| validate(&clean, &config).unwrap())
    });

    c.bench_function("validate_forged_no_recovery", |b| {
        let config = Config::default();
        b.iter(|| validate(&forged, &config))
    });

    c.bench_function("validate_forged_recovery", |b| {
        let config = Config::default()
            .with_recovery(true)
            .with_corrected_output(true);
        b.iter(|| validate(&forged, &config))
    });
}

criterion_group!(benches, validator_benchmarks);
criterion_main!(benches);
