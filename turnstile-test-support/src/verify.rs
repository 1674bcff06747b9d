//! Exactly-once verification of consumed values.
//!
//! Producer `p` of `P` sends tags `p * items .. (p + 1) * items`, so a clean
//! run consumes every tag in `0..P * items` exactly once.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verification {
    pub missing: u64,
    pub duplicates: u64,
    pub out_of_range: u64,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.duplicates == 0 && self.out_of_range == 0
    }
}

pub struct Verifier {
    seen: Vec<u8>,
    duplicates: u64,
    out_of_range: u64,
}

impl Verifier {
    pub fn new(expected_total: u64) -> Self {
        Self {
            seen: vec![0; expected_total as usize],
            duplicates: 0,
            out_of_range: 0,
        }
    }

    pub fn record(&mut self, tag: u64) {
        match self.seen.get_mut(tag as usize) {
            Some(count) if *count > 0 => {
                self.duplicates += 1;
                *count = count.saturating_add(1);
            }
            Some(count) => *count = 1,
            None => self.out_of_range += 1,
        }
    }

    pub fn record_all(&mut self, tags: impl IntoIterator<Item = u64>) {
        for tag in tags {
            self.record(tag);
        }
    }

    pub fn finish(&self) -> Verification {
        Verification {
            missing: self.seen.iter().filter(|&&count| count == 0).count() as u64,
            duplicates: self.duplicates,
            out_of_range: self.out_of_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run() {
        let mut verifier = Verifier::new(4);
        verifier.record_all([3, 1, 0, 2]);
        assert!(verifier.finish().is_clean());
    }

    #[test]
    fn test_detects_loss_and_duplication() {
        let mut verifier = Verifier::new(4);
        verifier.record_all([0, 1, 1, 1, 9]);

        let result = verifier.finish();
        assert_eq!(result.missing, 2);
        assert_eq!(result.duplicates, 2);
        assert_eq!(result.out_of_range, 1);
        assert!(!result.is_clean());
    }
}
