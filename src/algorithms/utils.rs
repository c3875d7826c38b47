use crate::algorithms::split::SplitStrategy;
use crate::bounding_box::BoundingBox;
use crate::error::RTreeError;
use crate::index::BoxIndex;
use crate::rtree::RTree;

/// 比较节点边界框与重算结果时允许的误差
const BOX_TOLERANCE: f64 = 1e-9;

fn corrupted(message: String) -> RTreeError {
    RTreeError::CorruptedTree(message)
}

/// R-tree工具函数实现
impl<V: PartialEq, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 完整遍历检查树的不变量
    ///
    /// - 每个节点的边界框等于其条目（或子节点）边界框的并集
    /// - 子节点的父引用指向包含它的节点，根节点没有父节点
    /// - 所有叶子在同一深度
    /// - 节点大小不超过最大值，非根节点不少于最小值，且没有空节点
    /// - 条目数与 `len()` 一致；索引记录数据时与树中的条目一一对应
    pub fn check_invariants(&self) -> Result<(), RTreeError> {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(corrupted(format!("empty tree reports {} entries", self.len)));
            }
            return Ok(());
        };
        if let Some(parent) = self.arena.node(root).parent() {
            return Err(corrupted(format!("root {root} has parent {parent}")));
        }

        let mut leaf_depth = None;
        let mut count = 0;
        for view in self.iter() {
            let id = view.id();
            let size = view.size();
            if size == 0 {
                return Err(corrupted(format!("node {id} is empty")));
            }
            if size > self.max_entries() {
                return Err(corrupted(format!(
                    "node {id} holds {size} items, more than {}",
                    self.max_entries()
                )));
            }
            if view.parent().is_some() && size < self.min_entries() {
                return Err(corrupted(format!(
                    "node {id} holds {size} items, fewer than {}",
                    self.min_entries()
                )));
            }

            let expected = if view.is_leaf() {
                view.entries()
                    .iter()
                    .fold(BoundingBox::empty(), |acc, e| acc.union(&e.bounding_box))
            } else {
                view.children().iter().fold(BoundingBox::empty(), |acc, &child| {
                    acc.union(&self.arena.node(child).bounding_box())
                })
            };
            if !view.bounding_box().approx_eq(&expected, BOX_TOLERANCE) {
                return Err(corrupted(format!(
                    "node {id} has bounding box {} but its contents span {expected}",
                    view.bounding_box()
                )));
            }

            for &child in view.children() {
                if self.arena.node(child).parent() != Some(id) {
                    return Err(corrupted(format!("child {child} does not point back to {id}")));
                }
            }

            if view.is_leaf() {
                match leaf_depth {
                    None => leaf_depth = Some(view.depth()),
                    Some(depth) if depth != view.depth() => {
                        return Err(corrupted(format!(
                            "leaf {id} at depth {} but other leaves at depth {depth}",
                            view.depth()
                        )));
                    }
                    Some(_) => {}
                }
                count += size;

                if self.index.is_tracking() {
                    for entry in view.entries() {
                        if self.index.get(&entry.value) != Some(entry.bounding_box) {
                            return Err(corrupted(format!(
                                "entry {} in leaf {id} disagrees with the index",
                                entry.bounding_box
                            )));
                        }
                    }
                }
            }
        }

        if count != self.len {
            return Err(corrupted(format!(
                "tree holds {count} entries but reports {}",
                self.len
            )));
        }
        if self.index.is_tracking() && self.index.len() != count {
            return Err(corrupted(format!(
                "index holds {} records for {count} entries",
                self.index.len()
            )));
        }
        Ok(())
    }
}
