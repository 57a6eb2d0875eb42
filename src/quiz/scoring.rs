//! Raw score to IQ estimate conversion for the 50-item WPT-style test.

/// Half-open raw-score ranges and what the score typically means for a
/// working adult.
const LEVEL_DESCRIPTIONS: [(i64, i64, &str); 7] = [
    (0, 13, "Umumnya untuk tenaga kerja pabrik atau kuli angkut"),
    (
        13,
        16,
        "Tingkat terendah dimana tenaga kerja diminta mempelajari pekerjaan dari manual tertulis",
    ),
    (16, 19, "Tingkat dimana tenaga kerja mampu bekerja mandiri tanpa supervisi"),
    (
        19,
        25,
        "Skor rata-rata tenaga kerja yang bekerja dalam standard sistem alfa-numerik",
    ),
    (25, 27, "Umumnya para supervisor pertama"),
    (27, 31, "Umumnya manajemen atau teknisi tingkat yang lebih tinggi"),
    (31, 51, "Umumnya para profesional dan manajer eksekutif"),
];

pub const UNKNOWN_LEVEL: &str = "Deskripsi level IQ tidak tersedia untuk skor ini.";

pub fn describe_level(raw_score: i64) -> &'static str {
    LEVEL_DESCRIPTIONS
        .iter()
        .find(|(start, end, _)| (*start..*end).contains(&raw_score))
        .map(|(_, _, description)| *description)
        .unwrap_or(UNKNOWN_LEVEL)
}

/// Piecewise-linear mapping from percentage correct to an IQ estimate.
///
/// Out-of-range scores are not clamped: the outermost band's formula is
/// simply extended. Halves round to even.
pub fn estimate_iq(raw_score: i64, total_questions: u32) -> i64 {
    let pct = raw_score as f64 / f64::from(total_questions) * 100.0;

    let estimate = if pct >= 90.0 {
        140.0 + (pct - 90.0) * 2.0
    } else if pct >= 80.0 {
        130.0 + (pct - 80.0)
    } else if pct >= 70.0 {
        120.0 + (pct - 70.0)
    } else if pct >= 50.0 {
        100.0 + (pct - 50.0) * 0.8
    } else if pct >= 30.0 {
        90.0 - (50.0 - pct) * 0.5
    } else {
        70.0 - (30.0 - pct) * 0.3
    };

    estimate.round_ties_even() as i64
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScoreResult {
    pub raw_score: i64,
    pub iq_estimate: i64,
    pub level_description: &'static str,
}

impl ScoreResult {
    pub fn new(raw_score: i64, total_questions: u32) -> Self {
        Self {
            raw_score,
            iq_estimate: estimate_iq(raw_score, total_questions),
            level_description: describe_level(raw_score),
        }
    }
}
