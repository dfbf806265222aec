//! ADSR amplitude envelope.
//!
//! Stateless: amplitude is a pure function of time since note start and,
//! once released, time since release.

use crate::error::{AudioError, AudioResult};

/// Attack/decay/release in seconds, sustain as a level in 0-1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Adsr {
    pub fn validate(&self) -> AudioResult<()> {
        if self.attack < 0.0 || self.decay < 0.0 || self.release < 0.0 {
            return Err(AudioError::InvalidConfig(
                "Envelope times must be >= 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(AudioError::InvalidConfig(format!(
                "Sustain level must be in [0, 1], got {}",
                self.sustain
            )));
        }
        Ok(())
    }

    /// Held-note level `t` seconds after start (attack → decay → sustain)
    pub fn held_level(&self, t: f64) -> f64 {
        if t < self.attack {
            return t.max(0.0) / self.attack;
        }
        let after_attack = t - self.attack;
        if after_attack < self.decay {
            return 1.0 - (1.0 - self.sustain) * (after_attack / self.decay);
        }
        self.sustain
    }

    /// Amplitude at `since_start`, ramping to zero over `release` once released.
    ///
    /// The release ramp starts from whatever level the note had at the
    /// release instant.
    pub fn amplitude(&self, since_start: f64, since_release: Option<f64>) -> f64 {
        match since_release {
            None => self.held_level(since_start),
            Some(since_release) => {
                if since_release >= self.release {
                    return 0.0;
                }
                let at_release = self.held_level(since_start - since_release);
                at_release * (1.0 - since_release / self.release)
            }
        }
    }

    /// True once a released note has fully faded
    pub fn is_finished(&self, since_release: Option<f64>) -> bool {
        since_release.is_some_and(|t| t >= self.release)
    }

    /// Per-sample amplitudes for a block beginning at the given times
    pub fn fill(
        &self,
        out: &mut [f32],
        sample_rate: u32,
        since_start: f64,
        since_release: Option<f64>,
    ) {
        let dt = 1.0 / sample_rate as f64;
        for (i, amp) in out.iter_mut().enumerate() {
            let offset = i as f64 * dt;
            *amp = self.amplitude(since_start + offset, since_release.map(|r| r + offset)) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adsr() -> Adsr {
        Adsr {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.5,
            release: 0.4,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_held_stages() {
        let env = adsr();
        assert!(close(env.amplitude(0.0, None), 0.0));
        assert!(close(env.amplitude(0.05, None), 0.5));
        assert!(close(env.amplitude(0.1, None), 1.0));
        assert!(close(env.amplitude(0.2, None), 0.75));
        assert!(close(env.amplitude(0.3, None), 0.5));
        assert!(close(env.amplitude(10.0, None), 0.5));
    }

    #[test]
    fn test_release_ramps_from_release_level() {
        let env = adsr();
        // Released mid-attack at 0.05s (level 0.5)
        assert!(close(env.amplitude(0.05, Some(0.0)), 0.5));
        assert!(close(env.amplitude(0.25, Some(0.2)), 0.25));
        assert!(close(env.amplitude(0.45, Some(0.4)), 0.0));

        // Released during sustain
        assert!(close(env.amplitude(1.1, Some(0.1)), 0.375));
    }

    #[test]
    fn test_finished() {
        let env = adsr();
        assert!(!env.is_finished(None));
        assert!(!env.is_finished(Some(0.39)));
        assert!(env.is_finished(Some(0.4)));
    }

    #[test]
    fn test_zero_durations_degrade() {
        let env = Adsr {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.6,
            release: 0.0,
        };
        assert!(close(env.amplitude(0.0, None), 0.6));
        assert!(close(env.amplitude(1.0, Some(0.0)), 0.0));
        assert!(env.is_finished(Some(0.0)));
    }

    #[test]
    fn test_fill_matches_pointwise() {
        let env = adsr();
        let mut block = [0.0f32; 8];
        env.fill(&mut block, 100, 0.0, None);
        for (i, &amp) in block.iter().enumerate() {
            assert!((amp as f64 - env.amplitude(i as f64 / 100.0, None)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_validate() {
        assert!(Adsr::default().validate().is_ok());
        let bad = Adsr {
            sustain: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
