//! Chi-square check for die rolls derived from raw random words
//!
//! Each 32-bit word is reduced to a face in `0..6`. [`FaceMapping::Nibble`]
//! takes `(word & 0xF) % 6` like the dice firmware does; since 16 is not a
//! multiple of 6 that favours faces 0 to 3, which the check reliably catches
//! on large samples. [`FaceMapping::Rejection`] drops nibbles of 12 and up and
//! stays uniform.

use tracing::debug;

pub const FACES: usize = 6;

/// Acceptance threshold used by the dice firmware
pub const DEFAULT_CHI2_THRESHOLD: u64 = 9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceMapping {
    #[default]
    Nibble,
    Rejection,
}

impl FaceMapping {
    /// Face for a raw word, or `None` if the mapping discards it
    pub fn face(&self, raw: u32) -> Option<usize> {
        let nibble = (raw & 0xF) as usize;
        match self {
            FaceMapping::Nibble => Some(nibble % FACES),
            FaceMapping::Rejection if nibble < 2 * FACES => Some(nibble % FACES),
            FaceMapping::Rejection => None,
        }
    }
}

/// Per-face roll counts
#[derive(Clone, Debug, Default)]
pub struct DieTally {
    mapping: FaceMapping,
    counts: [u64; FACES],
    rejected: u64,
}

impl DieTally {
    pub fn new(mapping: FaceMapping) -> Self {
        Self {
            mapping,
            ..Default::default()
        }
    }

    pub fn record(&mut self, raw: u32) {
        match self.mapping.face(raw) {
            Some(face) => self.counts[face] += 1,
            None => self.rejected += 1,
        }
    }

    pub fn counts(&self) -> &[u64; FACES] {
        &self.counts
    }

    pub fn rolls(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn expected_per_face(&self) -> u64 {
        self.rolls() / FACES as u64
    }

    pub fn chi_square(&self) -> Option<u64> {
        chi_square_statistic(&self.counts, self.expected_per_face())
    }

    pub fn is_fair(&self, threshold: u64) -> bool {
        equal_distribution_chi2(&self.counts, self.expected_per_face(), threshold)
    }
}

/// `Σ (n_i - n0)² / n0` in integer arithmetic, `None` when `n0` is zero
pub fn chi_square_statistic(counts: &[u64], expected: u64) -> Option<u64> {
    if expected == 0 {
        return None;
    }

    let square_sum: u128 = counts
        .iter()
        .map(|&n| {
            let diff = n.abs_diff(expected) as u128;
            diff * diff
        })
        .sum();

    let statistic = (square_sum / expected as u128).min(u64::MAX as u128) as u64;
    debug!(
        "Chi-square over {} classes: {} (expected {} each)",
        counts.len(),
        statistic,
        expected
    );
    Some(statistic)
}

/// True when the counts are consistent with an equal distribution
pub fn equal_distribution_chi2(counts: &[u64], expected: u64, threshold: u64) -> bool {
    chi_square_statistic(counts, expected).is_some_and(|statistic| statistic <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_counts_pass() {
        assert_eq!(chi_square_statistic(&[100; FACES], 100), Some(0));
        assert!(equal_distribution_chi2(&[100; FACES], 100, DEFAULT_CHI2_THRESHOLD));
    }

    #[test]
    fn counts_below_expected_do_not_wrap() {
        // (90-100)² + (110-100)² = 200, / 100 = 2
        let counts = [90, 110, 100, 100, 100, 100];
        assert_eq!(chi_square_statistic(&counts, 100), Some(2));
    }

    #[test]
    fn skewed_counts_fail() {
        let counts = [200, 0, 100, 100, 100, 100];
        assert!(!equal_distribution_chi2(&counts, 100, DEFAULT_CHI2_THRESHOLD));
    }

    #[test]
    fn zero_expected_is_never_fair() {
        assert_eq!(chi_square_statistic(&[0; FACES], 0), None);
        assert!(!DieTally::new(FaceMapping::Nibble).is_fair(DEFAULT_CHI2_THRESHOLD));
    }

    #[test]
    fn nibble_mapping_is_biased_on_uniform_words() {
        let mut tally = DieTally::new(FaceMapping::Nibble);
        for raw in (0..60_000u32).map(|i| i % 16) {
            tally.record(raw);
        }

        // 16 nibbles: faces 0..4 get three of them, faces 4 and 5 get two
        assert_eq!(tally.counts(), &[11_250, 11_250, 11_250, 11_250, 7_500, 7_500]);
        assert!(!tally.is_fair(DEFAULT_CHI2_THRESHOLD));
    }

    #[test]
    fn rejection_mapping_is_uniform_on_uniform_words() {
        let mut tally = DieTally::new(FaceMapping::Rejection);
        for raw in (0..64_000u32).map(|i| i % 16) {
            tally.record(raw);
        }

        assert_eq!(tally.counts(), &[8_000; FACES]);
        assert_eq!(tally.rejected(), 16_000);
        assert_eq!(tally.chi_square(), Some(0));
        assert!(tally.is_fair(DEFAULT_CHI2_THRESHOLD));
    }

    #[test]
    fn only_the_low_nibble_matters() {
        let mapping = FaceMapping::Nibble;
        assert_eq!(mapping.face(0xFFFF_FFF7), Some(1));
        assert_eq!(mapping.face(0x0000_0007), Some(1));
        assert_eq!(FaceMapping::Rejection.face(0xC), None);
    }
}
