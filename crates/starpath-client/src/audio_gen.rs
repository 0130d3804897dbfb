//! Procedural soundscapes.
//!
//! Each soundscape is a short table of generators (oscillator or noise,
//! optional filter, optional pitch LFO, gain). One renderer interprets any
//! table into a seamless mono loop that the audio backend plays on repeat.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use starpath_core::SoundscapeId;

pub const SAMPLE_RATE: u32 = 44100;
/// Loop length. Every frequency and LFO rate in the tables completes a
/// whole number of cycles in this time, so the loop point is seamless.
pub const LOOP_SECONDS: f32 = 10.0;

const FILTER_Q: f32 = 1.0;
/// Fixed so every render of a noise soundscape is identical.
const NOISE_SEED: u64 = 0x5747_4f52;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Oscillator { waveform: Waveform, frequency: f32 },
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    Highpass,
    Bandpass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff: f32,
}

/// Sinusoidal pitch modulation: `depth` Hz of swing at `rate` Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSpec {
    pub rate: f32,
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSpec {
    pub source: Source,
    pub filter: Option<FilterSpec>,
    pub lfo: Option<LfoSpec>,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundscapeSpec {
    pub id: SoundscapeId,
    pub generators: &'static [GeneratorSpec],
}

const fn tone(waveform: Waveform, frequency: f32, gain: f32) -> GeneratorSpec {
    GeneratorSpec {
        source: Source::Oscillator {
            waveform,
            frequency,
        },
        filter: None,
        lfo: None,
        gain,
    }
}

const SPACE: &[GeneratorSpec] = &[tone(Waveform::Sine, 30.0, 0.08)];

const SUN: &[GeneratorSpec] = &[
    tone(Waveform::Sine, 40.0, 0.15),
    tone(Waveform::Triangle, 60.0, 0.08),
];

const ROCKY: &[GeneratorSpec] = &[GeneratorSpec {
    filter: Some(FilterSpec {
        kind: FilterKind::Highpass,
        cutoff: 500.0,
    }),
    ..tone(Waveform::Square, 880.0, 0.03)
}];

const ATMOSPHERIC: &[GeneratorSpec] = &[GeneratorSpec {
    filter: Some(FilterSpec {
        kind: FilterKind::Bandpass,
        cutoff: 300.0,
    }),
    lfo: Some(LfoSpec {
        rate: 0.3,
        depth: 20.0,
    }),
    ..tone(Waveform::Sawtooth, 220.0, 0.05)
}];

const EARTH: &[GeneratorSpec] = &[
    tone(Waveform::Sine, 174.0, 0.08),
    tone(Waveform::Sine, 261.0, 0.05),
];

const STORM: &[GeneratorSpec] = &[GeneratorSpec {
    source: Source::Noise,
    filter: Some(FilterSpec {
        kind: FilterKind::Bandpass,
        cutoff: 400.0,
    }),
    lfo: None,
    gain: 0.06,
}];

const GAS: &[GeneratorSpec] = &[GeneratorSpec {
    lfo: Some(LfoSpec {
        rate: 0.2,
        depth: 15.0,
    }),
    ..tone(Waveform::Triangle, 55.0, 0.12)
}];

const RINGS: &[GeneratorSpec] = &[
    tone(Waveform::Sine, 528.0, 0.04),
    tone(Waveform::Sine, 792.0, 0.03),
];

const ICE: &[GeneratorSpec] = &[GeneratorSpec {
    filter: Some(FilterSpec {
        kind: FilterKind::Highpass,
        cutoff: 1000.0,
    }),
    ..tone(Waveform::Sine, 1320.0, 0.04)
}];

pub fn soundscape_spec(id: SoundscapeId) -> SoundscapeSpec {
    let generators = match id {
        SoundscapeId::Space => SPACE,
        SoundscapeId::Sun => SUN,
        SoundscapeId::Rocky => ROCKY,
        SoundscapeId::Atmospheric => ATMOSPHERIC,
        SoundscapeId::Earth => EARTH,
        SoundscapeId::Storm => STORM,
        SoundscapeId::Gas => GAS,
        SoundscapeId::Rings => RINGS,
        SoundscapeId::Ice => ICE,
    };
    SoundscapeSpec { id, generators }
}

/// Second-order IIR section, RBJ cookbook coefficients.
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn new(spec: FilterSpec, sample_rate: f32) -> Self {
        let w0 = TAU * spec.cutoff / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * FILTER_Q);
        let a0 = 1.0 + alpha;
        let (b0, b1, b2) = match spec.kind {
            FilterKind::Highpass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

fn waveform_sample(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

/// Render one generator for `len` samples. Filtered generators are run
/// through one full loop first so the filter state at the loop point
/// matches the start.
fn render_generator(gen: &GeneratorSpec, sample_rate: f32, len: usize, out: &mut [f32]) {
    let mut filter = gen.filter.map(|f| Biquad::new(f, sample_rate));
    let passes = if filter.is_some() { 2 } else { 1 };
    let mut phase = 0.0f32;

    for pass in 0..passes {
        let keep = pass == passes - 1;
        // Each pass replays the same sequence so the warmed-up filter
        // state continues seamlessly into the loop start.
        let mut noise = StdRng::seed_from_u64(NOISE_SEED);
        for i in 0..len {
            let t = i as f32 / sample_rate;
            let raw = match gen.source {
                Source::Oscillator {
                    waveform,
                    frequency,
                } => {
                    let freq = match gen.lfo {
                        Some(lfo) => frequency + lfo.depth * (TAU * lfo.rate * t).sin(),
                        None => frequency,
                    };
                    let s = waveform_sample(waveform, phase);
                    phase = (phase + freq / sample_rate).rem_euclid(1.0);
                    s
                }
                Source::Noise => noise.gen_range(-1.0f32..=1.0),
            };
            let filtered = match filter.as_mut() {
                Some(f) => f.process(raw),
                None => raw,
            };
            if keep {
                out[i] += filtered * gen.gain;
            }
        }
    }
}

/// Mix every generator of `spec` into a mono buffer in [-1, 1].
pub fn render(spec: &SoundscapeSpec, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let len = (sample_rate as f32 * seconds) as usize;
    let mut mix = vec![0.0f32; len];
    for gen in spec.generators {
        render_generator(gen, sample_rate as f32, len, &mut mix);
    }
    for s in &mut mix {
        *s = s.clamp(-1.0, 1.0);
    }
    mix
}

/// A loopable WAV file (mono, 16-bit PCM) for one soundscape.
pub fn soundscape_wav(id: SoundscapeId, sample_rate: u32, seconds: f32) -> Vec<u8> {
    let samples: Vec<i16> = render(&soundscape_spec(id), sample_rate, seconds)
        .into_iter()
        .map(|s| (s * 32767.0) as i16)
        .collect();
    write_wav_mono(sample_rate, &samples)
}

/// Write mono 16-bit PCM WAV data.
fn write_wav_mono(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let num_channels = 1u16;
    let bits_per_sample = 16u16;
    let byte_rate = sample_rate * num_channels as u32 * bits_per_sample as u32 / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(file_size as usize + 8);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
