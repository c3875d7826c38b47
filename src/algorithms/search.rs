use crate::algorithms::split::SplitStrategy;
use crate::bounding_box::BoundingBox;
use crate::index::BoxIndex;
use crate::node::{Entry, NodeKind};
use crate::rtree::RTree;

/// 搜索操作相关算法
impl<V, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 返回所有与查询框相交的条目（边界接触也算相交）
    ///
    /// 结果顺序没有约定。
    pub fn find(&self, query: &BoundingBox) -> Vec<&Entry<V>> {
        self.find_with_limit(query, 0)
    }

    /// 同 [`find`](Self::find)，最多返回 `limit` 个条目；`limit == 0` 表示不限制
    pub fn find_with_limit(&self, query: &BoundingBox, limit: usize) -> Vec<&Entry<V>> {
        self.search(query, limit, |entry| entry.bounding_box.intersects(query))
    }

    /// 返回边界框完全落在查询框内的条目
    pub fn find_contained(&self, query: &BoundingBox) -> Vec<&Entry<V>> {
        self.search(query, 0, |entry| query.overlaps(&entry.bounding_box))
    }

    /// 深度优先搜索 - 遵循论文Search算法
    ///
    /// 用显式栈代替递归，只下降到与查询框相交的子节点。
    fn search<'a, F>(&'a self, query: &BoundingBox, limit: usize, matches: F) -> Vec<&'a Entry<V>>
    where
        F: Fn(&Entry<V>) -> bool,
    {
        let mut results = Vec::new();
        let mut stack: Vec<_> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            match &self.arena.node(id).kind {
                // S2: 叶子节点中收集匹配的条目
                NodeKind::Leaf(entries) => {
                    for entry in entries {
                        if !matches(entry) {
                            continue;
                        }
                        results.push(entry);
                        // limit == 0 表示无限制，其他值表示有限制
                        if limit > 0 && results.len() >= limit {
                            return results;
                        }
                    }
                }
                // S1: 搜索子树
                NodeKind::Inner(children) => {
                    stack.extend(children.iter().rev().copied().filter(|&child| {
                        self.arena.node(child).bounding_box().intersects(query)
                    }));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use crate::bounding_box::BoundingBox;
    use crate::rtree::RTree;

    fn values(mut found: Vec<i32>) -> Vec<i32> {
        found.sort_unstable();
        found
    }

    fn build() -> RTree<i32> {
        let mut rtree = RTree::new(1, 3);
        rtree.insert(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1).unwrap();
        rtree.insert(BoundingBox::new(5.0, 5.0, 10.0, 10.0), 2).unwrap();
        rtree.insert(BoundingBox::new(20.0, 20.0, 10.0, 10.0), 3).unwrap();
        rtree.insert(BoundingBox::new(40.0, 0.0, 5.0, 5.0), 4).unwrap();
        rtree.insert(BoundingBox::new(8.0, 8.0, 1.0, 1.0), 5).unwrap();
        rtree
    }

    #[test]
    fn test_find_intersecting() {
        let rtree = build();
        let query = BoundingBox::new(8.0, 8.0, 4.0, 4.0);
        let found = rtree.find(&query).into_iter().map(|e| e.value).collect();
        assert_eq!(values(found), vec![1, 2, 5]);

        let far = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        assert!(rtree.find(&far).is_empty());
    }

    #[test]
    fn test_find_touching_boundary() {
        let rtree = build();
        // 只在 x = 30 处接触第 3 个框
        let query = BoundingBox::new(30.0, 25.0, 5.0, 1.0);
        let found = rtree.find(&query).into_iter().map(|e| e.value).collect();
        assert_eq!(values(found), vec![3]);
    }

    #[test]
    fn test_find_with_limit() {
        let rtree = build();
        let everything = BoundingBox::new(-1.0, -1.0, 100.0, 100.0);
        assert_eq!(rtree.find(&everything).len(), 5);
        assert_eq!(rtree.find_with_limit(&everything, 2).len(), 2);
        assert_eq!(rtree.find_with_limit(&everything, 0).len(), 5);
    }

    #[test]
    fn test_find_contained() {
        let rtree = build();
        let query = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let found = rtree.find_contained(&query).into_iter().map(|e| e.value).collect();
        assert_eq!(values(found), vec![1, 5]);
    }

    #[test]
    fn test_find_on_empty_tree() {
        let rtree: RTree<i32> = RTree::default();
        assert!(rtree.find(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).is_empty());
        assert!(rtree.find(&BoundingBox::empty()).is_empty());
    }
}
