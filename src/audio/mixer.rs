// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
// Mixes the tabla loop and melodic notes inside the output callback.
use std::f32::consts::FRAC_PI_4;
use std::time::Duration;

use super::{Buffer, MixSettings, StemPair, Voice};

/// Instructions sent from the control side to whatever owns the mixer.
#[derive(Debug)]
pub enum Command {
    StartStems { stems: StemPair, rate: f64 },
    QueueStems { stems: StemPair, rate: f64 },
    ReplaceStems { stems: StemPair, rate: f64 },
    StopStems,
    Note {
        voice: Voice,
        note: Buffer,
        delay: Duration,
        velocity: f32,
    },
    Mix(MixSettings),
}

/// Converts decibels to a linear gain factor.
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Converts a cents offset to a resampling ratio.
pub fn cents_to_ratio(cents: f32) -> f64 {
    2f64.powf(cents as f64 / 1200.0)
}

/// Equal power pan gains for a position between -1.0 and 1.0.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// A looping pair of stems. Lead and bass share one read position.
struct StemLoop {
    current: StemPair,
    pending: Option<(StemPair, f64)>,
    /// Read position in source frames of the current pair.
    position: f64,
    rate: f64,
}

impl StemLoop {
    fn new(stems: StemPair, rate: f64) -> StemLoop {
        StemLoop {
            current: stems,
            pending: None,
            position: 0.0,
            rate,
        }
    }

    /// Swaps in new stems at the same relative position in the loop.
    fn replace(&mut self, stems: StemPair, rate: f64) {
        let old_len = self.current.lead.frames() as f64;
        let phase = if old_len > 0.0 {
            self.position / old_len
        } else {
            0.0
        };
        self.position = phase * stems.lead.frames() as f64;
        self.current = stems;
        self.pending = None;
        self.rate = rate;
    }

    fn advance(&mut self, step: f64) {
        self.position += step;
        loop {
            let len = self.current.lead.frames() as f64;
            if len <= 0.0 {
                self.position = 0.0;
                return;
            }
            if self.position < len {
                return;
            }
            self.position -= len;
            if let Some((next, rate)) = self.pending.take() {
                self.current = next;
                self.rate = rate;
            }
        }
    }
}

/// A one-shot note on a melodic voice.
struct NoteVoice {
    voice: Voice,
    note: Buffer,
    delay_frames: u64,
    position: f64,
    velocity: f32,
}

/// Mixes the tabla loop and melodic notes into an interleaved output buffer.
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
    stems: Option<StemLoop>,
    notes: Vec<NoteVoice>,
    mix: MixSettings,
}

impl Mixer {
    pub fn new(channels: u16, sample_rate: u32) -> Mixer {
        Mixer {
            sample_rate,
            channels: channels.max(1),
            stems: None,
            notes: Vec::new(),
            mix: MixSettings::default(),
        }
    }

    /// Applies a single command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::StartStems { stems, rate } => self.stems = Some(StemLoop::new(stems, rate)),
            Command::QueueStems { stems, rate } => match self.stems.as_mut() {
                Some(stem_loop) => stem_loop.pending = Some((stems, rate)),
                None => self.stems = Some(StemLoop::new(stems, rate)),
            },
            Command::ReplaceStems { stems, rate } => match self.stems.as_mut() {
                Some(stem_loop) => stem_loop.replace(stems, rate),
                None => self.stems = Some(StemLoop::new(stems, rate)),
            },
            Command::StopStems => self.stems = None,
            Command::Note {
                voice,
                note,
                delay,
                velocity,
            } => self.notes.push(NoteVoice {
                voice,
                note,
                delay_frames: (delay.as_secs_f64() * self.sample_rate as f64).round() as u64,
                position: 0.0,
                velocity,
            }),
            Command::Mix(mix) => self.mix = mix,
        }
    }

    /// Returns true if the stems are looping.
    pub fn stems_playing(&self) -> bool {
        self.stems.is_some()
    }

    /// Number of notes still sounding or waiting to start.
    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    /// Fills the interleaved output buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.channels as usize;
        let out_rate = self.sample_rate as f64;
        let master = db_to_gain(self.mix.master_db);
        let bayan = db_to_gain(self.mix.bayan_db);
        let tune = cents_to_ratio(self.mix.tune_cents);
        let voice_pans = [pan_gains(self.mix.pans[0]), pan_gains(self.mix.pans[1])];

        for frame in output.chunks_mut(channels) {
            let mut left = 0.0f32;
            let mut right = 0.0f32;

            if let Some(stem_loop) = self.stems.as_mut() {
                let lead = &stem_loop.current.lead;
                let bass = &stem_loop.current.bass;
                left += lead.sample_at(stem_loop.position, 0)
                    + bass.sample_at(stem_loop.position, 0) * bayan;
                right += lead.sample_at(stem_loop.position, 1)
                    + bass.sample_at(stem_loop.position, 1) * bayan;
                let step = stem_loop.rate * lead.sample_rate() as f64 / out_rate;
                stem_loop.advance(step);
            }

            for note in self.notes.iter_mut() {
                if note.delay_frames > 0 {
                    note.delay_frames -= 1;
                    continue;
                }
                let (pan_left, pan_right) = voice_pans[note.voice.index()];
                let mono = (note.note.sample_at(note.position, 0)
                    + note.note.sample_at(note.position, 1))
                    * 0.5
                    * note.velocity;
                left += mono * pan_left;
                right += mono * pan_right;
                note.position += tune * note.note.sample_rate() as f64 / out_rate;
            }

            if channels == 1 {
                frame[0] = (left + right) * 0.5 * master;
            } else {
                frame[0] = left * master;
                frame[1] = right * master;
            }
        }

        self.notes
            .retain(|note| note.position < note.note.frames() as f64);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ramp(frames: usize, sample_rate: u32) -> Buffer {
        Buffer::new((0..frames).map(|i| i as f32).collect(), 1, sample_rate)
    }

    fn constant(value: f32, frames: usize, sample_rate: u32) -> Buffer {
        Buffer::new(vec![value; frames], 1, sample_rate)
    }

    fn unity_mixer(channels: u16, sample_rate: u32) -> Mixer {
        let mut mixer = Mixer::new(channels, sample_rate);
        mixer.apply(Command::Mix(MixSettings {
            master_db: 0.0,
            pans: [0.0, 0.0],
            tune_cents: 0.0,
            bayan_db: 0.0,
        }));
        mixer
    }

    #[test]
    fn test_gain_conversions() {
        assert_eq!(1.0, db_to_gain(0.0));
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
        assert_eq!(1.0, cents_to_ratio(0.0));
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-9);

        let (left, right) = pan_gains(-1.0);
        assert!((left - 1.0).abs() < 1e-6 && right.abs() < 1e-6);
        let (left, right) = pan_gains(0.0);
        assert!((left - right).abs() < 1e-6);
    }

    #[test]
    fn test_stems_advance_by_rate() {
        let mut mixer = unity_mixer(1, 100);
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: ramp(100, 100),
                bass: constant(0.0, 100, 100),
            },
            rate: 2.0,
        });

        let mut output = vec![0.0; 4];
        mixer.process(&mut output);
        // Mono output halves the summed left/right signal of a mono source.
        assert_eq!(vec![0.0, 2.0, 4.0, 6.0], output);
    }

    #[test]
    fn test_queued_stems_switch_at_boundary() {
        let mut mixer = unity_mixer(1, 100);
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: constant(1.0, 4, 100),
                bass: constant(0.0, 4, 100),
            },
            rate: 1.0,
        });

        let mut output = vec![0.0; 2];
        mixer.process(&mut output);
        assert_eq!(vec![1.0, 1.0], output);

        mixer.apply(Command::QueueStems {
            stems: StemPair {
                lead: constant(3.0, 4, 100),
                bass: constant(0.0, 4, 100),
            },
            rate: 1.0,
        });

        // The rest of the current loop plays out before the switch.
        let mut output = vec![0.0; 4];
        mixer.process(&mut output);
        assert_eq!(vec![1.0, 1.0, 3.0, 3.0], output);
    }

    #[test]
    fn test_queued_rate_waits_for_boundary() {
        let mut mixer = unity_mixer(1, 100);
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: ramp(4, 100),
                bass: constant(0.0, 4, 100),
            },
            rate: 1.0,
        });
        mixer.apply(Command::QueueStems {
            stems: StemPair {
                lead: ramp(8, 100),
                bass: constant(0.0, 8, 100),
            },
            rate: 2.0,
        });

        let mut output = vec![0.0; 6];
        mixer.process(&mut output);
        assert_eq!(vec![0.0, 1.0, 2.0, 3.0, 0.0, 2.0], output);
    }

    #[test]
    fn test_replace_keeps_phase() {
        let mut mixer = unity_mixer(1, 100);
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: ramp(4, 100),
                bass: constant(0.0, 4, 100),
            },
            rate: 1.0,
        });
        let mut output = vec![0.0; 2];
        mixer.process(&mut output);

        // Halfway through a four frame loop becomes halfway through an eight frame one.
        mixer.apply(Command::ReplaceStems {
            stems: StemPair {
                lead: ramp(8, 100),
                bass: constant(0.0, 8, 100),
            },
            rate: 1.0,
        });
        let mut output = vec![0.0; 2];
        mixer.process(&mut output);
        assert_eq!(vec![4.0, 5.0], output);
    }

    #[test]
    fn test_lead_and_bass_stay_locked() {
        let mut mixer = unity_mixer(2, 100);
        mixer.apply(Command::Mix(MixSettings {
            master_db: 0.0,
            pans: [0.0, 0.0],
            tune_cents: 0.0,
            bayan_db: -120.0,
        }));
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: ramp(10, 100),
                bass: ramp(10, 100),
            },
            rate: 1.5,
        });

        let mut output = vec![0.0; 8];
        mixer.process(&mut output);
        // Bass is effectively muted; lead is read at 0, 1.5, 3, 4.5.
        let left: Vec<f32> = output.iter().step_by(2).map(|s| s.round()).collect();
        assert_eq!(vec![0.0, 2.0, 3.0, 5.0], left);

        mixer.apply(Command::Mix(MixSettings {
            master_db: 0.0,
            pans: [0.0, 0.0],
            tune_cents: 0.0,
            bayan_db: 0.0,
        }));
        let mut output = vec![0.0; 2];
        mixer.process(&mut output);
        // Both stems read the same position, so the sum doubles the ramp.
        assert_eq!(12.0, output[0]);
    }

    #[test]
    fn test_stop_stems() {
        let mut mixer = unity_mixer(1, 100);
        mixer.apply(Command::StartStems {
            stems: StemPair {
                lead: constant(1.0, 4, 100),
                bass: constant(1.0, 4, 100),
            },
            rate: 1.0,
        });
        assert!(mixer.stems_playing());
        mixer.apply(Command::StopStems);
        assert!(!mixer.stems_playing());

        let mut output = vec![1.0; 4];
        mixer.process(&mut output);
        assert_eq!(vec![0.0; 4], output);
    }

    #[test]
    fn test_note_delay_and_pan() {
        let mut mixer = unity_mixer(2, 100);
        mixer.apply(Command::Mix(MixSettings {
            master_db: 0.0,
            pans: [-1.0, 1.0],
            tune_cents: 0.0,
            bayan_db: 0.0,
        }));
        mixer.apply(Command::Note {
            voice: Voice::One,
            note: constant(1.0, 2, 100),
            delay: Duration::from_millis(20),
            velocity: 1.0,
        });

        let mut output = vec![0.0; 8];
        mixer.process(&mut output);
        // Two frames of delay, then two frames hard left.
        assert_eq!(0.0, output[0]);
        assert_eq!(0.0, output[2]);
        assert!((output[4] - 1.0).abs() < 1e-6);
        assert!(output[5].abs() < 1e-6);
        assert!((output[6] - 1.0).abs() < 1e-6);
        assert_eq!(0, mixer.active_notes());
    }
}
