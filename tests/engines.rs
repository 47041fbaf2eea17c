use anyhow::Result;
use dreamfx::fx::reverb::PlateVariant;
use dreamfx::fx::shapers::{self, SaturationMode};
use dreamfx::{
    DelayParams, DualDelay, Effect, ParamSet, PlateReverb, ReverbParams, Saturation,
    SaturationParams, Settings,
};

const BLOCK: usize = 256;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Run `input` through `engine` in blocks, with the smoothers snapped to `params`.
fn render<E: Effect>(engine: &mut E, params: &E::Params, input: &[(f32, f32)]) -> Vec<(f32, f32)> {
    engine.snap_parameters(params);
    let mut out = Vec::with_capacity(input.len());
    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];
    for chunk in input.chunks(BLOCK) {
        let (l, r) = (&mut left[..chunk.len()], &mut right[..chunk.len()]);
        for (i, &(a, b)) in chunk.iter().enumerate() {
            l[i] = a;
            r[i] = b;
        }
        engine.process(l, r, params);
        out.extend(l.iter().copied().zip(r.iter().copied()));
    }
    out
}

fn impulse(len: usize) -> Vec<(f32, f32)> {
    let mut input = vec![(0.0, 0.0); len];
    input[0] = (1.0, 1.0);
    input
}

fn peak(samples: &[(f32, f32)]) -> f32 {
    samples
        .iter()
        .fold(0.0f32, |m, &(l, r)| m.max(l.abs()).max(r.abs()))
}

/// Index of the last 1024-sample window whose energy is within 60 dB of the loudest.
fn decay_time(samples: &[(f32, f32)]) -> usize {
    const WINDOW: usize = 1024;
    let energies: Vec<f64> = samples
        .chunks(WINDOW)
        .map(|w| w.iter().map(|&(l, r)| f64::from(l * l + r * r)).sum())
        .collect();
    let loudest = energies.iter().copied().fold(0.0, f64::max);
    let last = energies
        .iter()
        .rposition(|&e| e > loudest * 1e-6)
        .unwrap_or(0);
    (last + 1) * WINDOW
}

#[test]
fn reverb_impulse_decays_within_rt60_bound() {
    init_logger();
    let sample_rate = 44_100.0;
    let params = ReverbParams {
        mix: 1.0,
        size: 0.6,
        damp: 0.3,
        tone: 0.5,
        shimmer: 0.0,
    };
    let mut reverb = PlateReverb::new(sample_rate, BLOCK);

    // Each trip around the tank passes the decay gain at least twice.
    let decay = f64::from(PlateVariant::Shimmer.tuning().decay(params.size));
    let loop_len: usize = reverb.buffer_lengths()[4..].iter().sum();
    let loops = 1e-3f64.ln() / (decay * decay).ln();
    let bound = (loops * loop_len as f64).ceil() as usize;

    let out = render(&mut reverb, &params, &impulse(bound + 8_192));
    let overall = peak(&out);
    assert!(overall > 0.0 && overall <= 1.0, "peak {overall}");

    let late = peak(&out[bound..]);
    assert!(
        late < overall * 1e-3,
        "still {late} after {bound} samples (peak {overall})"
    );
}

#[test]
fn reverb_decay_time_grows_with_size() {
    init_logger();
    let times: Vec<usize> = [0.0, 0.5, 1.0]
        .into_iter()
        .map(|size| {
            let mut reverb = PlateReverb::new(44_100.0, BLOCK);
            let params = ReverbParams {
                mix: 1.0,
                size,
                ..ReverbParams::default()
            };
            decay_time(&render(&mut reverb, &params, &impulse(1_200_000)))
        })
        .collect();

    assert!(
        times.windows(2).all(|w| w[0] < w[1]),
        "decay times not increasing: {times:?}"
    );
}

#[test]
fn delay_first_repeat_matches_time_control() {
    init_logger();
    let mut delay = DualDelay::new(44_100.0, BLOCK);
    let params = DelayParams {
        mix: 1.0,
        time: 0.35,
        feedback: 0.3,
        modulation: 0.0,
        ..DelayParams::default()
    };
    let expected = delay.first_delay_samples(params.time);
    // 20 ms * 80^0.35 at 44.1 kHz
    assert!((expected - 4088.4).abs() < 0.5, "{expected}");

    let out = render(&mut delay, &params, &impulse(8_192));
    let peak_at = out
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.0.abs().total_cmp(&b.1.0.abs()))
        .map(|(i, _)| i)
        .unwrap();
    assert!(
        (peak_at as f32 - expected).abs() <= 1.0,
        "peak at {peak_at}, expected {expected}"
    );
}

#[test]
fn tape_at_zero_drive_is_normalised_tanh() {
    let shaper = |x: f32| shapers::blend(x, 0.0, 0.0, 0.0);
    assert!((shaper(1.0) - 1.0).abs() < 1e-6);
    assert!((shaper(-1.0) + 1.0).abs() < 1e-6);
    // Not the identity.
    assert!((shaper(0.5) - 0.5).abs() > 1e-2);

    let mut previous = f32::NEG_INFINITY;
    for i in -100..=100 {
        let x = i as f32 / 100.0;
        let y = shaper(x);
        assert!((y + shaper(-x)).abs() < 1e-6, "odd at {x}");
        assert!(y > previous, "monotonic at {x}");
        previous = y;
        assert_eq!(y, SaturationMode::Tape.process(x, 0.0, 0.0));
    }
}

#[test]
fn saturation_passes_dry_signal_at_zero_mix() {
    init_logger();
    let mut saturation = Saturation::new(44_100.0, BLOCK);
    let params = SaturationParams {
        mix: 0.0,
        output: 0.5,
        ..SaturationParams::default()
    };
    let input: Vec<(f32, f32)> = (0..10_000)
        .map(|i| {
            let t = i as f32 / 44_100.0;
            ((t * 220.0 * std::f32::consts::TAU).sin() * 0.8, (t * 330.0).cos() * 0.5)
        })
        .collect();
    assert_eq!(render(&mut saturation, &params, &input), input);
}

#[test]
fn controls_ramp_instead_of_jumping() {
    let mut saturation = Saturation::new(48_000.0, BLOCK);
    let unity = SaturationParams {
        mix: 0.0,
        output: 0.5,
        ..SaturationParams::default()
    };
    saturation.snap_parameters(&unity);

    let params = SaturationParams {
        output: 1.0,
        ..unity
    };
    let mut left = vec![0.1f32; BLOCK];
    let mut right = vec![0.1f32; BLOCK];
    saturation.process(&mut left, &mut right, &params);
    assert!(left[0] < 0.11, "first sample jumped to {}", left[0]);
    assert!(left[BLOCK - 1] > left[0]);

    for _ in 0..10 {
        left.fill(0.1);
        right.fill(0.1);
        saturation.process(&mut left, &mut right, &params);
    }
    // +12 dB once the 20 ms ramp has finished.
    assert!((left[BLOCK - 1] - 0.398).abs() < 1e-3, "{}", left[BLOCK - 1]);
}

fn assert_prepare_is_idempotent<E: Effect>(mut engine: E, params: &E::Params) {
    let sample_rate = engine.sample_rate();
    let input = impulse(20_000);
    let fresh = render(&mut engine, params, &input);

    engine.prepare(sample_rate, BLOCK);
    engine.prepare(sample_rate, BLOCK);
    assert_eq!(render(&mut engine, params, &input), fresh);
}

#[test]
fn prepare_twice_restores_initial_state() {
    init_logger();
    assert_prepare_is_idempotent(
        PlateReverb::new(48_000.0, BLOCK),
        &ReverbParams {
            shimmer: 0.7,
            ..ReverbParams::default()
        },
    );
    assert_prepare_is_idempotent(DualDelay::new(48_000.0, BLOCK), &DelayParams::default());
    assert_prepare_is_idempotent(
        Saturation::new(48_000.0, BLOCK),
        &SaturationParams::default(),
    );
}

#[test]
fn buffers_follow_the_sample_rate() {
    let mut reverb = PlateReverb::new(48_000.0, BLOCK);
    let at_48k = reverb.buffer_lengths();
    reverb.prepare(96_000.0, BLOCK);
    let at_96k = reverb.buffer_lengths();
    for (a, b) in at_48k.iter().zip(&at_96k) {
        assert!(b.abs_diff(a * 2) <= 1, "{a} -> {b}");
    }

    let mut delay = DualDelay::new(48_000.0, BLOCK);
    delay.prepare(96_000.0, BLOCK);
    assert_eq!(delay.buffer_len(), 158_400);
}

#[test]
fn engines_built_from_saved_settings() -> Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.reverb.variant = PlateVariant::Classic;
    settings.delay.buffer_seconds = 2.0;
    settings.save_to(&path)?;

    let loaded = Settings::load_from(&path)?;
    let reverb = PlateReverb::with_settings(&loaded.reverb, 48_000.0, BLOCK);
    let delay = DualDelay::with_settings(&loaded.delay, 48_000.0, BLOCK);
    assert_eq!(reverb.variant(), PlateVariant::Classic);
    assert_eq!(delay.buffer_len(), 96_000);
    assert_eq!(reverb.tail_seconds(), 6.0);
    assert_eq!(delay.tail_seconds(), 4.0);

    Ok(())
}

#[test]
fn parameter_sets_restore_legacy_sessions() -> Result<()> {
    let session = r#"{ "mix": 0.25, "param5": 0.5 }"#;
    let reverb: ReverbParams = serde_json::from_str(session)?;
    assert_eq!(reverb.shimmer, 0.5);
    assert_eq!(reverb.get_parameter("param5"), Ok(0.5));

    let mut saturation = SaturationParams::default();
    saturation
        .set_parameter("type", 0.9)
        .map_err(anyhow::Error::msg)?;
    assert_eq!(SaturationMode::from_control(saturation.kind), SaturationMode::Fold);
    assert!(saturation.set_parameter("type", 2.0).is_err());

    Ok(())
}
