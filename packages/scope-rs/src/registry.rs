use std::collections::HashMap;

/// Run-local mapping from channel label to a dense integer index.
///
/// Indices are handed out in order of first appearance. A registry lives
/// for exactly one conversion run.
#[derive(Debug, Default, Clone)]
pub struct ChannelRegistry {
    labels: Vec<String>,
    indices: HashMap<String, usize>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `label`, registering it if this is its first sighting.
    pub fn index_for(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.indices.get(label) {
            return idx;
        }
        let idx = self.labels.len();
        self.labels.push(label.to_string());
        self.indices.insert(label.to_string(), idx);
        log::debug!("Registered channel '{}' as index {}", label, idx);
        idx
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Current size, to be passed back to [`rollback_to`](Self::rollback_to).
    pub fn checkpoint(&self) -> usize {
        self.labels.len()
    }

    /// Forget every label registered after `checkpoint`.
    pub fn rollback_to(&mut self, checkpoint: usize) {
        for label in self.labels.drain(checkpoint.min(self.labels.len())..) {
            self.indices.remove(&label);
        }
    }

    /// `(index, label)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_appearance_order() {
        let mut registry = ChannelRegistry::new();
        let assigned: Vec<usize> = ["CH1", "CH2", "CH1"]
            .iter()
            .map(|label| registry.index_for(label))
            .collect();

        assert_eq!(assigned, vec![0, 1, 0]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("CH1"), Some(0));
        assert_eq!(registry.get("CH2"), Some(1));
        assert_eq!(registry.get("CH3"), None);
    }

    #[test]
    fn test_iter_is_index_ordered() {
        let mut registry = ChannelRegistry::new();
        registry.index_for("CHAN3");
        registry.index_for("CHAN1");
        let pairs: Vec<(usize, &str)> = registry.iter().collect();
        assert_eq!(pairs, vec![(0, "CHAN3"), (1, "CHAN1")]);
    }

    #[test]
    fn test_rollback_discards_new_labels_only() {
        let mut registry = ChannelRegistry::new();
        registry.index_for("CH1");
        let mark = registry.checkpoint();
        registry.index_for("CH2");
        registry.index_for("CH1");
        registry.index_for("CH3");

        registry.rollback_to(mark);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("CH2"), None);
        assert_eq!(registry.index_for("CH3"), 1);
    }

    #[test]
    fn test_fresh_registry_per_run() {
        let mut first = ChannelRegistry::new();
        first.index_for("CH2");
        let mut second = ChannelRegistry::new();
        assert_eq!(second.index_for("CH1"), 0);
    }
}
