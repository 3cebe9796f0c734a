//! In-run deduplication: keeps the first occurrence of each fingerprint.
//! Pure function, no persistence — cross-run/cross-source merging is the
//! downstream store's job.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeStats {
    pub total_input: usize,
    pub unique_output: usize,
    pub duplicates_removed: usize,
}

pub fn dedupe<T>(items: Vec<T>, fingerprint_of: impl Fn(&T) -> String) -> (Vec<T>, DedupeStats) {
    let total_input = items.len();
    let mut seen = std::collections::HashSet::with_capacity(total_input);
    let mut out = Vec::with_capacity(total_input);

    for item in items {
        let fp = fingerprint_of(&item);
        if seen.insert(fp) {
            out.push(item);
        }
    }

    let stats = DedupeStats {
        total_input,
        unique_output: out.len(),
        duplicates_removed: total_input - out.len(),
    };
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_and_reports_stats() {
        let items = vec![("a", 1), ("b", 2), ("a", 3)];
        let (out, stats) = dedupe(items, |(fp, _)| fp.to_string());
        assert_eq!(out, vec![("a", 1), ("b", 2)]);
        assert_eq!(stats, DedupeStats { total_input: 3, unique_output: 2, duplicates_removed: 1 });
    }

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let items: Vec<(&str, i32)> = Vec::new();
        let (out, stats) = dedupe(items, |(fp, _)| fp.to_string());
        assert!(out.is_empty());
        assert_eq!(stats, DedupeStats::default());
    }
}
