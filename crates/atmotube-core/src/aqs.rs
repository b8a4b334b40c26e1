//! Air Quality Score (AQS) calculation.
//!
//! The AQS is a 0-100 score where 100 is the cleanest air. It is derived from
//! four channels: VOC (in ppm) and PM1, PM2.5 and PM10 (in µg/m³). Each
//! channel is scored with piecewise-linear interpolation and the worst
//! channel wins.
//!
//! # Example
//!
//! ```
//! use atmotube_core::aqs::{AqsLevel, calc_aqs};
//!
//! let score = calc_aqs(0.0, 3.0, 5.0, 8.0);
//! assert_eq!(score, 94);
//! assert_eq!(AqsLevel::from_score(score), AqsLevel::Good);
//! ```

use serde::{Deserialize, Serialize};

use atmotube_types::SensorSnapshot;

/// Breakpoints of one particulate channel, in µg/m³.
///
/// Each step spans 20 AQS points: values up to `L[0]` score 100-80, values up
/// to `L[1]` score 80-60, and so on.
pub type Ladder = [f64; 5];

/// PM1 breakpoints.
pub const PM1_LADDER: Ladder = [14.0, 34.0, 61.0, 95.0, 100.0];

/// PM2.5 breakpoints.
pub const PM25_LADDER: Ladder = [20.0, 50.0, 90.0, 140.0, 170.0];

/// PM10 breakpoints.
pub const PM10_LADDER: Ladder = [30.0, 75.0, 125.0, 200.0, 250.0];

/// Highest possible score.
pub const AQS_MAX: u8 = 100;

fn clamp_score(raw: f64) -> u8 {
    // `as` truncates toward zero and saturates; NaN becomes 0.
    raw.trunc().clamp(0.0, f64::from(AQS_MAX)) as u8
}

/// Score the VOC channel.
///
/// `voc_ppm` is the VOC concentration in parts per million.
#[must_use]
pub fn aqs_from_voc(voc_ppm: f64) -> u8 {
    let raw = if voc_ppm < 0.5 {
        100.0 - 60.0 * voc_ppm
    } else if voc_ppm < 2.0 {
        (118.0 - 26.0 * voc_ppm) / 1.5
    } else {
        (374.0 - 44.0 * voc_ppm) / 6.5
    };
    clamp_score(raw)
}

/// Score one particulate channel against its ladder.
#[must_use]
pub fn aqs_from_pm(value: f64, ladder: &Ladder) -> u8 {
    let step = ladder
        .iter()
        .position(|&level| value <= level)
        .unwrap_or(ladder.len() - 1);
    let floor = if step > 0 { ladder[step - 1] } else { 0.0 };
    let span = ladder[step] - floor;
    let raw = 100.0 - 20.0 * step as f64 - 20.0 * (value - floor) / span;
    clamp_score(raw)
}

/// Combine the four channels into one score (the minimum sub-score).
#[must_use]
pub fn calc_aqs(voc_ppm: f64, pm1: f64, pm25: f64, pm10: f64) -> u8 {
    [
        aqs_from_voc(voc_ppm),
        aqs_from_pm(pm1, &PM1_LADDER),
        aqs_from_pm(pm25, &PM25_LADDER),
        aqs_from_pm(pm10, &PM10_LADDER),
    ]
    .into_iter()
    .min()
    .unwrap_or(0)
}

/// Score a snapshot, if VOC, PM1, PM2.5 and PM10 are all known.
#[must_use]
pub fn aqs_for_snapshot(snapshot: &SensorSnapshot) -> Option<u8> {
    Some(calc_aqs(
        snapshot.voc_ppm()?,
        snapshot.pm1()?,
        snapshot.pm25()?,
        snapshot.pm10()?,
    ))
}

/// Air quality band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqsLevel {
    /// 81-100.
    Good,
    /// 61-80.
    Moderate,
    /// 41-60.
    Polluted,
    /// 21-40.
    VeryPolluted,
    /// 0-20.
    Severe,
}

impl AqsLevel {
    /// Band containing `score`.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            81.. => AqsLevel::Good,
            61..=80 => AqsLevel::Moderate,
            41..=60 => AqsLevel::Polluted,
            21..=40 => AqsLevel::VeryPolluted,
            _ => AqsLevel::Severe,
        }
    }

    /// Get a human-readable description of the band.
    pub fn description(&self) -> &'static str {
        match self {
            AqsLevel::Good => "Good - clean air",
            AqsLevel::Moderate => "Moderate - acceptable air",
            AqsLevel::Polluted => "Polluted - consider ventilation",
            AqsLevel::VeryPolluted => "Very polluted - ventilate or leave",
            AqsLevel::Severe => "Severe - avoid exposure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_characteristic;
    use atmotube_types::{CharacteristicKind, Particulates, SensorSnapshot};

    #[test]
    fn test_aqs_from_voc_segments() {
        assert_eq!(aqs_from_voc(0.0), 100);
        assert_eq!(aqs_from_voc(0.25), 85);
        // 0.5 moves to the second segment: (118 - 13) / 1.5 = 70
        assert_eq!(aqs_from_voc(0.5), 70);
        assert_eq!(aqs_from_voc(1.0), 61);
        // 2.0 moves to the third segment: (374 - 88) / 6.5 = 44
        assert_eq!(aqs_from_voc(2.0), 44);
        assert_eq!(aqs_from_voc(8.5), 0);
        assert_eq!(aqs_from_voc(100.0), 0);
    }

    #[test]
    fn test_aqs_from_voc_negative_input_is_capped() {
        assert_eq!(aqs_from_voc(-1.0), 100);
    }

    #[test]
    fn test_aqs_from_pm_first_step() {
        assert_eq!(aqs_from_pm(0.0, &PM25_LADDER), 100);
        assert_eq!(aqs_from_pm(10.0, &PM25_LADDER), 90);
        assert_eq!(aqs_from_pm(20.0, &PM25_LADDER), 80);
    }

    #[test]
    fn test_aqs_from_pm_later_steps() {
        // 35 is halfway between 20 and 50: 100 - 20 - 10 = 70
        assert_eq!(aqs_from_pm(35.0, &PM25_LADDER), 70);
        assert_eq!(aqs_from_pm(50.0, &PM25_LADDER), 60);
        assert_eq!(aqs_from_pm(170.0, &PM25_LADDER), 0);
    }

    #[test]
    fn test_aqs_from_pm_beyond_ladder() {
        assert_eq!(aqs_from_pm(500.0, &PM25_LADDER), 0);
        assert_eq!(aqs_from_pm(1000.0, &PM10_LADDER), 0);
    }

    #[test]
    fn test_calc_aqs_takes_worst_channel() {
        // voc 0 -> 100, pm1 3 -> 95, pm25 5 -> 95, pm10 8 -> 94
        assert_eq!(calc_aqs(0.0, 3.0, 5.0, 8.0), 94);
        // PM10 dominates
        assert_eq!(calc_aqs(0.0, 0.0, 0.0, 200.0), 20);
    }

    #[test]
    fn test_aqs_for_snapshot_requires_all_inputs() {
        let mut snapshot = SensorSnapshot::new("aa");
        snapshot.voc = Some(100);
        assert_eq!(aqs_for_snapshot(&snapshot), None);

        snapshot.particulates = Some(Particulates {
            pm1: Some(1.0),
            pm25: None,
            pm10: Some(2.0),
            pm4: None,
        });
        assert_eq!(aqs_for_snapshot(&snapshot), None);

        snapshot.particulates = Some(Particulates {
            pm1: Some(1.0),
            pm25: Some(1.4),
            pm10: Some(2.45),
            pm4: None,
        });
        assert_eq!(
            aqs_for_snapshot(&snapshot),
            Some(calc_aqs(0.1, 1.0, 1.4, 2.45))
        );
    }

    #[test]
    fn test_voc_score_in_range_over_full_grid() {
        // 0..=100 ppm in 0.001 ppm steps
        for milli_ppm in 0u32..=100_000 {
            let score = aqs_from_voc(f64::from(milli_ppm) / 1000.0);
            assert!(score <= AQS_MAX, "voc {} ppm scored {}", milli_ppm, score);
        }
    }

    #[test]
    fn test_pm_score_in_range_over_full_grid() {
        // 0.01..=1000 µg/m³ in 0.01 steps, every ladder
        for ladder in [PM1_LADDER, PM25_LADDER, PM10_LADDER] {
            let mut previous = AQS_MAX;
            for centi in 1u32..=100_000 {
                let score = aqs_from_pm(f64::from(centi) / 100.0, &ladder);
                assert!(score <= AQS_MAX);
                assert!(score <= previous, "score rose at {} µg/m³", centi);
                previous = score;
            }
        }
    }

    #[test]
    fn test_snapshot_score_uses_exact_hundredths() {
        // PM1 only; every other channel scores 100.
        for (raw, expected) in [(490u32, 93), (630, 91), (910, 87), (980, 86), (1260, 82)] {
            let le = raw.to_le_bytes();
            let frame = [le[0], le[1], le[2], 0, 0, 0, 0, 0, 0, 0, 0, 0];
            let patch = decode_characteristic(CharacteristicKind::Particulate, &frame)
                .into_patch()
                .unwrap();

            let mut snapshot = SensorSnapshot::new("aa");
            snapshot.voc = Some(0);
            snapshot.apply(&patch);

            let exact = calc_aqs(0.0, f64::from(raw) / 100.0, 0.0, 0.0);
            assert_eq!(exact, expected);
            assert_eq!(aqs_for_snapshot(&snapshot), Some(exact), "pm1 raw {}", raw);
        }
    }

    #[test]
    fn test_aqs_level_bands() {
        assert_eq!(AqsLevel::from_score(100), AqsLevel::Good);
        assert_eq!(AqsLevel::from_score(81), AqsLevel::Good);
        assert_eq!(AqsLevel::from_score(80), AqsLevel::Moderate);
        assert_eq!(AqsLevel::from_score(41), AqsLevel::Polluted);
        assert_eq!(AqsLevel::from_score(21), AqsLevel::VeryPolluted);
        assert_eq!(AqsLevel::from_score(0), AqsLevel::Severe);
        assert!(AqsLevel::Severe.description().starts_with("Severe"));
    }
}
