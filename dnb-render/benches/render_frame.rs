use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use dnb_core::{Letter, Position, TrialCue};
use dnb_render::{GridRenderer, Scene};
use dnb_timing::HighPrecisionTimer;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn harness() -> (GridRenderer, Vec<u8>, HighPrecisionTimer) {
    let r = GridRenderer::new(WIDTH, HEIGHT).expect("renderer");
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

fn presenting() -> Scene {
    Scene {
        cue: Some(TrialCue {
            index: 10,
            total: 25,
            position: Position::new(7).expect("position"),
            letter: Letter::Q,
            can_respond: true,
        }),
        n_level: 3,
        progress: Some((11, 25)),
        position_feedback: Some(true),
        audio_feedback: None,
    }
}

pub fn bench_frames(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("first_frame", |b| {
        b.iter_batched(
            harness,
            |(mut r, mut fb, t)| black_box(r.render_frame(&presenting(), &mut fb, &t)),
            BatchSize::LargeInput,
        )
    });

    g.bench_function("steady_state", |b| {
        let (mut r, mut fb, t) = harness();
        let gap = Scene {
            cue: None,
            ..presenting()
        };
        let _ = r.render_frame(&gap, &mut fb, &t);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let scene = if flip { presenting() } else { gap };
            black_box(r.render_frame(&scene, &mut fb, &t))
        })
    });

    g.finish();
}

criterion_group!(benches, bench_frames);
criterion_main!(benches);
