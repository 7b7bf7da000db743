//! Tag occurrence counter for a batch run.

use std::collections::HashMap;

/// Counts how often each tag was written over a run.
///
/// Owned by the batch loop and lent to the scorer per image.
#[derive(Debug, Clone, Default)]
pub struct TagFrequency {
    counts: HashMap<String, u64>,
}

impl TagFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tag: &str) {
        *self.counts.entry(tag.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, tag: &str) -> u64 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Tags by count descending, then name ascending.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_sort() {
        let mut freq = TagFrequency::new();
        for tag in ["solo", "1girl", "solo", "smile", "1girl", "solo"] {
            freq.record(tag);
        }
        assert_eq!(freq.get("solo"), 3);
        assert_eq!(freq.get("missing"), 0);
        assert_eq!(
            freq.sorted(),
            vec![("solo", 3), ("1girl", 2), ("smile", 1)]
        );
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let mut freq = TagFrequency::new();
        freq.record("b");
        freq.record("a");
        assert_eq!(freq.sorted(), vec![("a", 1), ("b", 1)]);
    }
}
