use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use ax12_hardware::FrameParser;
use ax12_hardware::frame::{instruction, instruction_frame, status_frame};

// A plausible RX capture: status answers interleaved with line noise.
fn synth_wire(frames: usize, seed: u32) -> Vec<u8> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut wire = Vec::new();
    for i in 0..frames {
        for _ in 0..(next() % 4) {
            let junk = (next() % 256) as u8;
            if junk != 0xFF {
                wire.push(junk);
            }
        }
        let id = (i % 18) as u8;
        let value = (next() % 1024) as u16;
        wire.extend(status_frame(id, 0, &value.to_le_bytes()));
    }
    wire
}

pub fn bench_frame_codec(c: &mut Criterion) {
    let mut g = c.benchmark_group("frame_codec");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }

    g.bench_function("encode_goal_write", |b| {
        b.iter(|| {
            let frame = instruction_frame(
                black_box(7),
                instruction::WRITE_DATA,
                black_box(&[0x1E, 0xFF, 0x01]),
            );
            black_box(frame);
        })
    });

    let wire = synth_wire(1_000, 0xC0FFEE);
    g.bench_function("parse_noisy_capture", |b| {
        b.iter_batched(
            || wire.clone(),
            |bytes| {
                let mut parser = FrameParser::new();
                let mut decoded = 0usize;
                for byte in bytes {
                    if let Ok(Some(_)) = parser.push(byte) {
                        decoded += 1;
                    }
                }
                black_box(decoded);
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(frame_codec, bench_frame_codec);
criterion_main!(frame_codec);
