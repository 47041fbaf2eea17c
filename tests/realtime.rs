use assert_no_alloc::{AllocDisabler, assert_no_alloc};
use dreamfx::{
    DelayParams, DualDelay, Effect, PlateReverb, ReverbParams, Saturation, SaturationParams,
};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK: usize = 128;

/// Process blocks while moving every control, failing on any allocation.
fn process_without_alloc<E: Effect>(engine: &mut E, settings: &[E::Params]) {
    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];
    let mut phase = 0.0f32;

    for params in settings {
        for _ in 0..50 {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                phase += 0.031;
                *l = phase.sin() * 0.7;
                *r = (phase * 1.3).cos() * 0.7;
            }
            assert_no_alloc(|| engine.process(&mut left, &mut right, params));
            assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
        }
    }
}

#[test]
fn reverb_processes_without_allocating() {
    let mut reverb = PlateReverb::new(SAMPLE_RATE, BLOCK);
    process_without_alloc(
        &mut reverb,
        &[
            ReverbParams::default(),
            ReverbParams {
                mix: 1.0,
                size: 1.0,
                damp: 0.0,
                tone: 1.0,
                shimmer: 1.0,
            },
            ReverbParams {
                mix: 0.5,
                size: 0.0,
                damp: 1.0,
                tone: 0.0,
                shimmer: 0.0,
            },
        ],
    );
}

#[test]
fn delay_processes_without_allocating() {
    let mut delay = DualDelay::new(SAMPLE_RATE, BLOCK);
    process_without_alloc(
        &mut delay,
        &[
            DelayParams::default(),
            DelayParams {
                mix: 1.0,
                time: 1.0,
                feedback: 1.0,
                tone: 0.0,
                sub: 1.0,
                pingpong: 1.0,
                modulation: 1.0,
            },
            DelayParams {
                time: 0.0,
                tone: 1.0,
                sub: 0.0,
                ..DelayParams::default()
            },
        ],
    );
}

#[test]
fn saturation_processes_without_allocating() {
    let mut saturation = Saturation::new(SAMPLE_RATE, BLOCK);
    process_without_alloc(
        &mut saturation,
        &[
            SaturationParams::default(),
            SaturationParams {
                grit: 1.0,
                tone: 1.0,
                warmth: 1.0,
                attack: 0.0,
                output: 1.0,
                mix: 1.0,
                drive: 1.0,
                kind: 1.0,
                comp: 1.0,
            },
            SaturationParams {
                kind: 0.5,
                comp: 0.0,
                tone: 0.0,
                ..SaturationParams::default()
            },
        ],
    );
}
