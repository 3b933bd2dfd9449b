//! Tone synthesis into interleaved stereo PCM

use std::f32::consts::TAU;

use crate::sound_output::{CHANNELS, PAN_LIMIT, SoundOutput};

/// Linear pan gains for a pan position in -100..=100.
///
/// `left = (100 - pan) / 200`, `right = (100 + pan) / 200`. The gains sum to
/// one, so the center position is about 3 dB quieter than hard left or right.
#[inline]
pub fn pan_gains(pan_position: f32) -> (f32, f32) {
    let pan = pan_position.clamp(-PAN_LIMIT, PAN_LIMIT);
    let left = (PAN_LIMIT - pan) / (2.0 * PAN_LIMIT);
    let right = (PAN_LIMIT + pan) / (2.0 * PAN_LIMIT);
    (left, right)
}

/// Write `frames` sample frames of the output's tone into `out`.
///
/// Phase continues from `sound.t_sine` and is left wrapped into [0, 2π)
/// for the next call. `out` must hold at least `frames * 2` samples; extra
/// space is left untouched. Returns the written slice length in samples.
pub fn synthesize_tone(sound: &mut SoundOutput, frames: usize, out: &mut [i16]) -> usize {
    let len = (frames * CHANNELS as usize).min(out.len() - out.len() % CHANNELS as usize);
    let (left_gain, right_gain) = pan_gains(sound.pan_position);
    let step = sound.phase_step();

    for frame in out[..len].chunks_exact_mut(CHANNELS as usize) {
        let value = sound.t_sine.sin() * sound.tone_volume;
        frame[0] = to_i16(value * left_gain);
        frame[1] = to_i16(value * right_gain);

        sound.t_sine += step;
        if sound.t_sine >= TAU {
            sound.t_sine = sound.t_sine.rem_euclid(TAU);
        }
    }

    len
}

#[inline]
fn to_i16(value: f32) -> i16 {
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone() -> SoundOutput {
        let mut sound = SoundOutput::new(48_000, 60);
        sound.tone_hz = 440.0;
        sound.tone_volume = 10_000.0;
        sound
    }

    #[test]
    fn test_pan_center_is_half_each() {
        let (l, r) = pan_gains(0.0);
        assert_eq!(l, 0.5);
        assert_eq!(r, 0.5);
        // Linear law: total power at center is 0.5, not 1.0
        assert!((l * l + r * r - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pan_extremes() {
        assert_eq!(pan_gains(-100.0), (1.0, 0.0));
        assert_eq!(pan_gains(100.0), (0.0, 1.0));
        assert_eq!(pan_gains(500.0), (0.0, 1.0));
    }

    #[test]
    fn test_phase_continuity_across_calls() {
        let mut whole = tone();
        let mut split = tone();
        let mut a = vec![0i16; 2_000];
        let mut b = vec![0i16; 2_000];

        synthesize_tone(&mut whole, 1_000, &mut a);
        synthesize_tone(&mut split, 500, &mut b[..1_000]);
        synthesize_tone(&mut split, 500, &mut b[1_000..]);

        for (x, y) in a.iter().zip(&b) {
            assert!((*x as i32 - *y as i32).abs() <= 1);
        }
        assert!((whole.t_sine - split.t_sine).abs() < 1e-3);
    }

    #[test]
    fn test_phase_stays_wrapped() {
        let mut sound = tone();
        let mut out = vec![0i16; 96_000];
        synthesize_tone(&mut sound, 48_000, &mut out);
        assert!(sound.t_sine >= 0.0 && sound.t_sine < TAU);
    }

    #[test]
    fn test_first_sample_is_zero_crossing() {
        let mut sound = tone();
        let mut out = vec![1i16; 4];
        synthesize_tone(&mut sound, 2, &mut out);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 0);
        assert!(out[2] > 0);
    }

    #[test]
    fn test_hard_left_silences_right() {
        let mut sound = tone();
        sound.set_pan(-100.0);
        let mut out = vec![0i16; 200];
        synthesize_tone(&mut sound, 100, &mut out);
        assert!(out.chunks_exact(2).all(|f| f[1] == 0));
        assert!(out.chunks_exact(2).any(|f| f[0] != 0));
    }

    #[test]
    fn test_output_is_bounded_by_buffer() {
        let mut sound = tone();
        let mut out = vec![0i16; 10];
        assert_eq!(synthesize_tone(&mut sound, 100, &mut out), 10);
        assert_eq!(synthesize_tone(&mut sound, 0, &mut out), 0);
    }
}
