use crate::algorithms::split::SplitStrategy;
use crate::bounding_box::BoundingBox;
use crate::index::BoxIndex;
use crate::node::{Entry, NodeId, NodeKind};
use crate::rtree::RTree;
use tracing::{debug, error, trace, warn};

/// R-tree删除算法实现
impl<V: Clone + PartialEq, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 删除指定值对应的条目 - 遵循论文Algorithm Delete
    ///
    /// 值不存在时什么也不做。
    pub fn remove(&mut self, value: &V) {
        // D1: 找到包含目标条目的叶子节点
        if let Some(leaf) = self.locate_leaf(value) {
            // D2: 从叶子节点删除条目
            if self.arena.remove_entry_by_value(leaf, value) {
                self.len -= 1;
                trace!(len = self.len, "removed entry");

                // D3: 压缩树，下溢节点的条目重新插入
                self.condense_tree(leaf);

                // D4: 如果根节点只有一个子节点，则缩短树
                self.shorten_tree();
            }
        }
        self.index.delete(value);
    }

    /// 查找包含指定值的叶子节点
    ///
    /// 索引中有记录时只下降到边界框包含目标框的子节点；
    /// 没有记录或者下降没有命中时，退化为扫描所有叶子。
    fn locate_leaf(&self, value: &V) -> Option<NodeId> {
        let root = self.root?;
        if let Some(bounding_box) = self.index.get(value) {
            if let Some(leaf) = self.find_leaf(root, &bounding_box, value) {
                return Some(leaf);
            }
            warn!(%bounding_box, "indexed entry not reachable by containment descent, scanning leaves");
        } else if self.index.is_tracking() {
            warn!("value missing from index, scanning leaves");
        }
        self.scan_leaves(value)
    }

    /// 沿包含目标框的路径查找精确匹配的条目
    fn find_leaf(&self, root: NodeId, bounding_box: &BoundingBox, value: &V) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match &self.arena.node(id).kind {
                NodeKind::Leaf(entries) => {
                    if entries
                        .iter()
                        .any(|e| e.bounding_box == *bounding_box && e.value == *value)
                    {
                        return Some(id);
                    }
                }
                NodeKind::Inner(children) => {
                    stack.extend(children.iter().rev().copied().filter(|&child| {
                        self.arena.node(child).bounding_box().overlaps(bounding_box)
                    }));
                }
            }
        }
        None
    }

    /// 遍历所有叶子，查找包含该值的叶子
    fn scan_leaves(&self, value: &V) -> Option<NodeId> {
        self.iter()
            .find(|view| view.entries().iter().any(|e| e.value == *value))
            .map(|view| view.id())
    }

    /// CondenseTree：从叶子向上摘除下溢的非根节点，再把它们的条目重新插入
    fn condense_tree(&mut self, leaf: NodeId) {
        let mut orphans = Vec::new();
        let mut current = leaf;
        loop {
            let node = self.arena.node(current);
            match node.parent() {
                Some(parent) if node.size() < self.min_entries() => {
                    self.arena.remove_child(parent, current);
                    orphans.push(current);
                    current = parent;
                }
                _ => {
                    self.arena.update_bounding_boxes(current);
                    break;
                }
            }
        }

        self.drop_empty_root();

        if orphans.is_empty() {
            return;
        }

        let mut entries: Vec<Entry<V>> = Vec::new();
        for orphan in &orphans {
            entries.extend(self.arena.release_subtree(*orphan));
        }
        debug!(
            nodes = orphans.len(),
            entries = entries.len(),
            "condensed underfull nodes"
        );

        // 重新插入不经过索引，索引中的记录已经是最新的
        self.len -= entries.len();
        for entry in entries {
            if let Err(err) = self.insert_entry(entry) {
                error!(%err, "reinsertion failed during condense");
                panic!("{err}");
            }
        }
    }

    /// 根节点只有一个子节点时，用子节点替换根节点
    fn shorten_tree(&mut self) {
        while let Some(root) = self.root {
            let only = match self.arena.node(root).children() {
                [only] => *only,
                _ => break,
            };
            self.arena.release(root);
            self.arena.node_mut(only).parent = None;
            self.root = Some(only);
            debug!(height = self.height(), "collapsed root");
        }
        self.drop_empty_root();
    }

    /// 根节点没有任何内容时树变为空树
    fn drop_empty_root(&mut self) {
        if let Some(root) = self.root {
            if self.arena.size(root) == 0 {
                self.arena.release(root);
                self.root = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::algorithms::split::{SplitKind, Splitter};
    use crate::bounding_box::BoundingBox;
    use crate::index::{BoxIndex, NoIndex};
    use crate::rtree::RTree;

    fn diagonal_tree(kind: SplitKind, n: usize) -> RTree<usize> {
        let mut rtree = RTree::with_split(kind, 2, 4);
        for i in 0..n {
            let v = i as f64 * 2.0;
            rtree.insert(BoundingBox::new(v, v, 1.0, 1.0), i).unwrap();
        }
        rtree
    }

    #[test]
    fn test_remove_from_empty_tree() {
        let mut rtree: RTree<usize> = RTree::default();
        rtree.remove(&0);
        assert!(rtree.is_empty());
        assert_eq!(rtree.iter().count(), 0);
    }

    #[test]
    fn test_remove_the_only_entry() {
        let mut rtree: RTree<usize> = RTree::default();
        rtree.insert(BoundingBox::new(10.0, 10.0, 1.0, 1.0), 0).unwrap();
        rtree.remove(&0);
        assert!(rtree.is_empty());
        assert_eq!(rtree.len(), 0);
        assert!(!rtree.contains(&0));
        assert_eq!(rtree.arena.live_count(), 0);
    }

    #[test]
    fn test_remove_missing_entry() {
        let mut rtree: RTree<usize> = RTree::default();
        let bounding_box = BoundingBox::new(10.0, 10.0, 1.0, 1.0);
        rtree.insert(bounding_box, 0).unwrap();
        rtree.remove(&1);

        let nodes: Vec<_> = rtree.iter().collect();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_leaf());
        assert_eq!(nodes[0].size(), 1);
        assert_eq!(nodes[0].depth(), 0);
        assert_eq!(nodes[0].parent(), None);
        assert_eq!(nodes[0].bounding_box(), bounding_box);
    }

    #[test]
    fn test_remove_shrinks_bounding_boxes() {
        let mut rtree: RTree<usize> = RTree::default();
        rtree.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0).unwrap();
        rtree.insert(BoundingBox::new(9.0, 9.0, 1.0, 1.0), 1).unwrap();
        rtree.insert(BoundingBox::new(2.0, 2.0, 1.0, 1.0), 2).unwrap();
        rtree.remove(&1);
        assert_eq!(rtree.root_bounding_box(), Some(BoundingBox::new(0.0, 0.0, 3.0, 3.0)));
    }

    #[test]
    fn test_remove_all_collapses_tree() {
        for kind in SplitKind::ALL {
            let mut rtree = diagonal_tree(kind, 20);
            assert!(rtree.height() > 1);
            for i in 0..20 {
                rtree.remove(&i);
                assert_eq!(rtree.len(), 19 - i);
                assert!(rtree.check_invariants().is_ok(), "{kind} after removing {i}");
                assert!(rtree.find(&BoundingBox::new(-1.0, -1.0, 100.0, 100.0))
                    .iter()
                    .all(|e| e.value != i));
            }
            assert!(rtree.is_empty());
            assert_eq!(rtree.arena.live_count(), 0);
        }
    }

    #[test]
    fn test_remove_reinserts_orphans() {
        let mut rtree = diagonal_tree(SplitKind::Quadratic, 9);
        let before = rtree.len();
        // 从中间删除，会让某个叶子下溢
        rtree.remove(&4);
        rtree.remove(&5);
        assert_eq!(rtree.len(), before - 2);
        rtree.check_invariants().unwrap();

        let mut values: Vec<usize> = rtree.entries().map(|e| e.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![0, 1, 2, 3, 6, 7, 8]);
    }

    #[test]
    fn test_remove_falls_back_when_descent_misses() {
        let mut rtree: RTree<usize> = RTree::new(1, 2);
        rtree.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0).unwrap();
        rtree.insert(BoundingBox::new(10.0, 10.0, 1.0, 1.0), 1).unwrap();
        // 负宽高的框单独留在一个叶子里，叶子的边界框保持未规范化的原值
        let reversed = BoundingBox::new(102.0, 102.0, -2.0, -2.0);
        rtree.insert(reversed, 2).unwrap();
        assert_eq!(rtree.height(), 2);
        rtree.check_invariants().unwrap();

        let root = rtree.root_id().unwrap();
        assert_eq!(rtree.index.get(&2), Some(reversed));
        assert!(rtree.find_leaf(root, &reversed, &2).is_none());

        rtree.remove(&2);
        assert_eq!(rtree.len(), 2);
        assert!(!rtree.contains(&2));
        assert!(rtree.entries().all(|e| e.value != 2));
        rtree.check_invariants().unwrap();
        assert_eq!(rtree.root_bounding_box(), Some(BoundingBox::new(0.0, 0.0, 11.0, 11.0)));
    }

    #[test]
    fn test_remove_reversed_and_fractional_boxes() {
        for kind in SplitKind::ALL {
            let mut rtree = RTree::with_split(kind, 2, 4);
            for i in 0..20 {
                let v = i as f64 * 0.1;
                let bounding_box = if i % 2 == 0 {
                    BoundingBox::new(v + 0.3, v + 0.3, -0.3, -0.3)
                } else {
                    BoundingBox::new(v, v, 0.3, 0.3)
                };
                rtree.insert(bounding_box, i).unwrap();
            }
            rtree.check_invariants().unwrap();

            for i in (0..20).rev() {
                rtree.remove(&i);
                assert!(!rtree.contains(&i), "{kind} kept {i}");
                assert_eq!(rtree.len(), i);
                rtree.check_invariants().unwrap();
            }
            assert!(rtree.is_empty());
            assert_eq!(rtree.arena.live_count(), 0);
        }
    }

    #[test]
    fn test_remove_without_index_scans_leaves() {
        let mut rtree: RTree<usize, Splitter, NoIndex> =
            RTree::with_parts(2, 4, Splitter::new(SplitKind::Linear, 2, 4), NoIndex);
        for i in 0..10 {
            let v = i as f64;
            rtree.insert(BoundingBox::new(v, 0.0, 0.5, 0.5), i).unwrap();
        }
        assert!(rtree.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 3).is_err());

        rtree.remove(&3);
        assert_eq!(rtree.len(), 9);
        assert!(!rtree.contains(&3));
        rtree.check_invariants().unwrap();
    }
}
