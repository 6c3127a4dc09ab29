//! Partition descriptors produced by the coordinator.

use serde::{Deserialize, Serialize};

/// A contiguous byte range of a source file plus host hints.
///
/// `index` is assigned by the coordinator in arrival order and is not part
/// of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    index: usize,
    path: String,
    from: u64,
    to: u64,
    hosts: Vec<String>,
}

impl PartitionDescriptor {
    /// Create a descriptor.
    pub fn new(index: usize, path: impl Into<String>, from: u64, to: u64, hosts: Vec<String>) -> Self {
        Self {
            index,
            path: path.into(),
            from,
            to,
            hosts,
        }
    }

    /// Zero-based ordinal.
    pub fn index(&self) -> usize {
        self.index
    }

    /// File path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Start offset.
    pub fn from(&self) -> u64 {
        self.from
    }

    /// End offset.
    pub fn to(&self) -> u64 {
        self.to
    }

    /// Preferred hosts, possibly empty.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Distance between the two offsets.
    pub fn byte_len(&self) -> u64 {
        self.to.saturating_sub(self.from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let split = PartitionDescriptor::new(1, "/data/input.csv", 1024, 2047, vec![]);
        assert_eq!(split.index(), 1);
        assert_eq!(split.path(), "/data/input.csv");
        assert_eq!(split.from(), 1024);
        assert_eq!(split.to(), 2047);
        assert!(split.hosts().is_empty());
        assert_eq!(split.byte_len(), 1023);
    }

    #[test]
    fn test_serde_json_shape() {
        let split = PartitionDescriptor::new(0, "/data/input.csv", 0, 1023, vec!["h1".into()]);
        let json = serde_json::to_value(&split).unwrap();

        assert_eq!(json["index"], 0);
        assert_eq!(json["path"], "/data/input.csv");
        assert_eq!(json["to"], 1023);
        assert_eq!(json["hosts"][0], "h1");

        let back: PartitionDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, split);
    }
}
