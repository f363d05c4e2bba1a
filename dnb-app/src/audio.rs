//! Synthesized letter cues and feedback sounds.
//!
//! Every sound is a mix of short oscillators with an exponentially decaying
//! envelope, rendered to a mono buffer once and replayed on demand.

use dnb_core::{AudioOutput, Letter, SilentAudio, Stimulus};
use log::{debug, info, warn};
use std::f32::consts::TAU;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44_100;
/// Level every envelope decays to at the end of its tone
const DECAY_FLOOR: f32 = 0.001;

const LETTER_LENGTH: Duration = Duration::from_millis(220);
const LETTER_GAIN: f32 = 0.12;
const CHIME_STEP: Duration = Duration::from_millis(120);
const CHIME_NOTES: [f32; 4] = [523.0, 659.0, 784.0, 1047.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Value at `phase` in [0, 1)
    fn sample(self, phase: f32) -> f32 {
        match self {
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
}

/// One oscillator, optionally gliding between two pitches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    pub glide: Duration,
    /// Delay from the start of the sound
    pub offset: Duration,
    pub length: Duration,
    pub gain: f32,
}

impl Tone {
    const fn steady(waveform: Waveform, hz: f32, length: Duration, gain: f32) -> Self {
        Self {
            waveform,
            start_hz: hz,
            end_hz: hz,
            glide: Duration::ZERO,
            offset: Duration::ZERO,
            length,
            gain,
        }
    }

    fn frequency_at(&self, t: f32) -> f32 {
        let glide = self.glide.as_secs_f32();
        if t >= glide {
            self.end_hz
        } else {
            self.start_hz + (self.end_hz - self.start_hz) * t / glide
        }
    }

    fn envelope(&self, t: f32) -> f32 {
        self.gain * (DECAY_FLOOR / self.gain).powf(t / self.length.as_secs_f32())
    }
}

/// Two-note chord identifying `letter`
pub fn letter_tones(letter: Letter) -> [Tone; 2] {
    use Waveform::*;
    let (low, high, waveform) = match letter {
        Letter::C => (523.25, 659.25, Sine),
        Letter::H => (587.33, 739.99, Sine),
        Letter::K => (440.00, 554.37, Triangle),
        Letter::L => (493.88, 622.25, Sine),
        Letter::Q => (392.00, 493.88, Triangle),
        Letter::R => (349.23, 440.00, Sine),
        Letter::S => (329.63, 415.30, Sawtooth),
        Letter::T => (293.66, 369.99, Triangle),
    };
    [low, high].map(|hz| Tone::steady(waveform, hz, LETTER_LENGTH, LETTER_GAIN))
}

/// Rising chirp for a correct press, low buzz for a wrong one
pub fn feedback_tone(correct: bool) -> Tone {
    if correct {
        Tone {
            end_hz: 880.0,
            glide: Duration::from_millis(80),
            ..Tone::steady(Waveform::Sine, 660.0, Duration::from_millis(150), 0.08)
        }
    } else {
        Tone::steady(Waveform::Square, 180.0, Duration::from_millis(200), 0.06)
    }
}

/// Rising arpeggio played when a session completes
pub fn session_end_tones() -> [Tone; 4] {
    let mut step = Duration::ZERO;
    CHIME_NOTES.map(|hz| {
        let tone = Tone {
            offset: step,
            ..Tone::steady(Waveform::Sine, hz, Duration::from_millis(300), 0.07)
        };
        step += CHIME_STEP;
        tone
    })
}

fn frames(d: Duration) -> usize {
    (d.as_secs_f64() * SAMPLE_RATE as f64).round() as usize
}

/// Mixes `tones` into one mono buffer at [`SAMPLE_RATE`]
pub fn render(tones: &[Tone]) -> Vec<f32> {
    let len = tones
        .iter()
        .map(|t| frames(t.offset + t.length))
        .max()
        .unwrap_or(0);
    let mut out = vec![0.0; len];
    let dt = 1.0 / SAMPLE_RATE as f32;

    for tone in tones {
        let span = frames(tone.offset)..frames(tone.offset + tone.length);
        let mut phase = 0.0f32;
        for (i, sample) in out[span].iter_mut().enumerate() {
            let t = i as f32 * dt;
            *sample += tone.waveform.sample(phase) * tone.envelope(t);
            phase = (phase + tone.frequency_at(t) * dt).fract();
        }
    }
    out
}

/// Every sound the app makes, rendered up front
#[derive(Debug, Clone)]
pub struct SoundBank {
    letters: Vec<Vec<f32>>,
    correct: Vec<f32>,
    wrong: Vec<f32>,
    session_end: Vec<f32>,
}

impl SoundBank {
    pub fn render() -> Self {
        Self {
            letters: Letter::ALL.map(|l| render(&letter_tones(l))).to_vec(),
            correct: render(&[feedback_tone(true)]),
            wrong: render(&[feedback_tone(false)]),
            session_end: render(&session_end_tones()),
        }
    }

    pub fn letter(&self, letter: Letter) -> &[f32] {
        &self.letters[letter.index()]
    }

    pub fn feedback(&self, correct: bool) -> &[f32] {
        if correct { &self.correct } else { &self.wrong }
    }

    pub fn session_end(&self) -> &[f32] {
        &self.session_end
    }
}

#[cfg(feature = "sound")]
pub use device::ToneAudio;

#[cfg(feature = "sound")]
mod device {
    use super::{SAMPLE_RATE, SoundBank};
    use anyhow::{Context, Result};
    use dnb_core::{AudioOutput, Letter};
    use log::{debug, warn};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle};

    /// Plays the sound bank on the default output device
    pub struct ToneAudio {
        // Dropping the stream closes the device
        _stream: OutputStream,
        handle: OutputStreamHandle,
        bank: SoundBank,
    }

    impl ToneAudio {
        pub fn open() -> Result<Self> {
            let (stream, handle) =
                OutputStream::try_default().context("no audio output device")?;
            Ok(Self {
                _stream: stream,
                handle,
                bank: SoundBank::render(),
            })
        }

        fn play(&self, samples: &[f32]) {
            let source = SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec());
            if let Err(e) = self.handle.play_raw(source) {
                warn!("Cannot play sound: {e}");
            }
        }
    }

    impl AudioOutput for ToneAudio {
        fn speak_letter(&self, letter: Letter) {
            debug!("say {letter}");
            self.play(self.bank.letter(letter));
        }

        fn play_feedback(&self, correct: bool) {
            self.play(self.bank.feedback(correct));
        }

        fn play_session_end(&self) {
            self.play(self.bank.session_end());
        }
    }
}

/// Sound output of the app. Falls back to silence without an output device.
pub enum AppAudio {
    #[cfg(feature = "sound")]
    Tones(ToneAudio),
    Silent(SilentAudio),
}

impl AppAudio {
    pub fn open() -> Self {
        #[cfg(feature = "sound")]
        {
            match ToneAudio::open() {
                Ok(tones) => {
                    info!("Audio output ready");
                    return AppAudio::Tones(tones);
                }
                Err(e) => warn!("Running without sound: {e:#}"),
            }
        }
        #[cfg(not(feature = "sound"))]
        info!("Built without sound");
        AppAudio::Silent(SilentAudio)
    }

    fn output(&self) -> &dyn AudioOutput {
        match self {
            #[cfg(feature = "sound")]
            AppAudio::Tones(tones) => tones as &dyn AudioOutput,
            AppAudio::Silent(silent) => silent as &dyn AudioOutput,
        }
    }
}

impl AudioOutput for AppAudio {
    fn speak_letter(&self, letter: Letter) {
        self.output().speak_letter(letter);
    }

    fn play_feedback(&self, correct: bool) {
        debug!("feedback: {}", if correct { "match" } else { "no match" });
        self.output().play_feedback(correct);
    }

    fn play_session_end(&self) {
        info!("Session complete");
        self.output().play_session_end();
    }
}
