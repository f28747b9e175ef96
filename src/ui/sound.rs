/// Sound effects: procedural 8-bit style blips via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely (the stub
/// SoundEngine does nothing). `Sfx::for_event` is always available.

use blastarena::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Place,
    Explode,
    Pickup,
    ShieldBreak,
    Skill,
    Death,
    Victory,
}

impl Sfx {
    pub const ALL: [Sfx; 7] = [
        Sfx::Place,
        Sfx::Explode,
        Sfx::Pickup,
        Sfx::ShieldBreak,
        Sfx::Skill,
        Sfx::Death,
        Sfx::Victory,
    ];

    /// Sound for a simulation event, if any. Chained detonations share the
    /// first blast's sound.
    pub fn for_event(ev: &GameEvent) -> Option<Sfx> {
        match ev {
            GameEvent::BombPlaced { .. } => Some(Sfx::Place),
            GameEvent::BombDetonated { chained: false, .. } => Some(Sfx::Explode),
            GameEvent::ItemCollected { .. } => Some(Sfx::Pickup),
            GameEvent::ShieldBroken { .. } => Some(Sfx::ShieldBreak),
            GameEvent::SkillActivated { .. } => Some(Sfx::Skill),
            GameEvent::PlayerKilled { .. } => Some(Sfx::Death),
            GameEvent::MatchOver { .. } => Some(Sfx::Victory),
            _ => None,
        }
    }
}

/// Sounds for one tick's events, deduplicated in first-seen order.
pub fn sfx_for_events(events: &[GameEvent]) -> Vec<Sfx> {
    let mut out = Vec::new();
    for s in events.iter().filter_map(Sfx::for_event) {
        if !out.contains(&s) { out.push(s); }
    }
    out
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::PI * 2.0;

    /// Pre-generated WAV buffers, indexed by `Sfx as usize`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("audio output unavailable: {e}");
                    return None;
                }
            };
            let buffers = Sfx::ALL.iter().map(|&s| Arc::new(make_wav(&generate(s)))).collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = &self.buffers[sfx as usize];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators, all mono f32
    // ════════════════════════════════════════════════════════════

    fn generate(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Place => gen_blip(220.0, 0.06, 0.3),
            Sfx::Explode => gen_explode(),
            Sfx::Pickup => gen_notes(&[1047.0, 1319.0, 1568.0], 0.045, 0.25),
            Sfx::ShieldBreak => gen_sweep(1200.0, 300.0, 0.18),
            Sfx::Skill => gen_sweep(300.0, 1100.0, 0.2),
            Sfx::Death => fade_tail(gen_notes(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.3)),
            Sfx::Victory => gen_notes(&[523.0, 659.0, 784.0, 1047.0, 1047.0], 0.1, 0.3),
        }
    }

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Square-ish arpeggio (sine plus 3rd harmonic).
    fn gen_notes(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5) * 0.7;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Noise burst over a low rumble.
    fn gen_explode() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.35) as usize;
        let mut rng: u32 = 0x9e37_79b9;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let freq = 90.0 - t * 50.0;
                let rumble = (ti * freq * TAU).sin();
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.5);
                (rumble * 0.5 + noise * 0.5) * env * 0.4
            })
            .collect()
    }

    fn gen_sweep(from: f32, to: f32, duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * TAU).sin() * env * 0.25
            })
            .collect()
    }

    fn fade_tail(mut samples: Vec<f32>) -> Vec<f32> {
        let total = samples.len();
        let fade_len = (total / 4).max(1);
        for i in total.saturating_sub(fade_len)..total {
            samples[i] *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder (16-bit PCM mono)
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API, no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}
