//! Audio fill statistics for a debug overlay
//!
//! Read-only rows describing the fill loop (regime, latency, underruns,
//! prediction error), formatted for display next to the sync markers.

use super::markers::MarkerRing;
use crate::engine::FillStats;
use crate::sound_output::SoundOutput;

/// A single debug statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStat {
    /// Display name for the stat
    pub name: String,
    /// Current value as a formatted string
    pub value: String,
}

impl DebugStat {
    /// Create a new debug stat with a string value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a debug stat from a numeric value.
    pub fn number(name: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Create a debug stat for a sample frame count, with its duration.
    pub fn samples(name: impl Into<String>, samples: i64, samples_per_second: u32) -> Self {
        let ms = if samples_per_second == 0 {
            0.0
        } else {
            samples as f64 * 1000.0 / samples_per_second as f64
        };
        Self {
            name: name.into(),
            value: format!("{} ({:.1} ms)", samples, ms),
        }
    }
}

/// Overlay rows for the current fill state.
pub fn fill_stats(stats: &FillStats, sound: &SoundOutput, markers: Option<&MarkerRing>) -> Vec<DebugStat> {
    let rate = sound.samples_per_second;
    let mut rows = vec![
        DebugStat::new(
            "Regime",
            stats.last_regime.map_or("none", |r| r.label()),
        ),
        DebugStat::samples("Latency", stats.last_latency_samples, rate),
        DebugStat::samples("Safety", sound.safety_sample_count as i64, rate),
        DebugStat::number("Frames", stats.frames),
        DebugStat::number("Skipped", stats.frames_skipped),
        DebugStat::number("Underruns", stats.underruns),
        DebugStat::number("Dropped", stats.dropped_writes),
    ];

    if let Some(mean) = markers.and_then(MarkerRing::mean_prediction_error) {
        let ms = if rate == 0 { 0.0 } else { mean * 1000.0 / rate as f64 };
        rows.push(DebugStat::new(
            "Flip error",
            format!("{:.1} ({:.2} ms)", mean, ms),
        ));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::LatencyRegime;

    #[test]
    fn test_samples_stat_formats_duration() {
        let stat = DebugStat::samples("Latency", 2_400, 48_000);
        assert_eq!(stat.value, "2400 (50.0 ms)");
    }

    #[test]
    fn test_fill_stats_rows() {
        let sound = SoundOutput::new(48_000, 60);
        let stats = FillStats {
            frames: 120,
            underruns: 2,
            last_regime: Some(LatencyRegime::Low),
            last_latency_samples: 1_600,
            ..FillStats::default()
        };

        let rows = fill_stats(&stats, &sound, None);

        assert_eq!(rows[0], DebugStat::new("Regime", "low-latency"));
        assert_eq!(rows[1].value, "1600 (33.3 ms)");
        assert!(rows.contains(&DebugStat::number("Underruns", 2)));
        assert!(!rows.iter().any(|r| r.name == "Flip error"));
    }
}
