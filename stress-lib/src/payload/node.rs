use std::fmt;

/// Identity of a simulated node within one operation.
///
/// Rendered 1-based and zero-padded to the digit width of the node count,
/// so `NodeId::new(7, 12)` displays as `07`. The rendered form is the
/// value of the node tag, which keeps the series of different nodes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    width: usize,
}

impl NodeId {
    pub fn new(index: usize, node_count: usize) -> Self {
        Self {
            index,
            width: digits(node_count),
        }
    }

    /// All node ids for an operation with `node_count` nodes.
    pub fn all(node_count: usize) -> impl Iterator<Item = NodeId> {
        (1..=node_count).map(move |index| NodeId::new(index, node_count))
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0>width$}", self.index, width = self.width)
    }
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_to_node_count_width() {
        assert_eq!(NodeId::new(1, 1).to_string(), "1");
        assert_eq!(NodeId::new(3, 9).to_string(), "3");
        assert_eq!(NodeId::new(3, 10).to_string(), "03");
        assert_eq!(NodeId::new(42, 100).to_string(), "042");
    }

    #[test]
    fn all_ids_are_unique_and_one_based() {
        let ids: Vec<String> = NodeId::all(12).map(|id| id.to_string()).collect();
        assert_eq!(ids.first().unwrap(), "01");
        assert_eq!(ids.last().unwrap(), "12");

        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), ids.len());
    }
}
