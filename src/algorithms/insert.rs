use crate::algorithms::split::SplitStrategy;
use crate::bounding_box::BoundingBox;
use crate::error::RTreeError;
use crate::index::BoxIndex;
use crate::node::{Entry, NodeId, NodeKind};
use crate::rtree::RTree;
use tracing::{debug, trace};

/// 插入操作相关算法
impl<V: Clone + PartialEq, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 插入新的数据条目 - 遵循论文Algorithm Insert
    ///
    /// 值在树中充当唯一键：空边界框返回 `EmptyBoundingBox`，
    /// 已存在的值返回 `DuplicateEntry`，两种情况下树都保持不变。
    pub fn insert(&mut self, bounding_box: BoundingBox, value: V) -> Result<(), RTreeError> {
        if bounding_box.is_empty() {
            return Err(RTreeError::EmptyBoundingBox);
        }
        if self.contains(&value) {
            return Err(RTreeError::DuplicateEntry);
        }

        self.index.put(value.clone(), bounding_box);
        if let Err(err) = self.insert_entry(Entry::new(bounding_box, value.clone())) {
            self.index.delete(&value);
            return Err(err);
        }
        trace!(%bounding_box, len = self.len, "inserted entry");
        Ok(())
    }

    /// 值是否已经存储在树中
    ///
    /// 索引不记录数据时退化为扫描所有叶子。
    pub fn contains(&self, value: &V) -> bool {
        if self.index.is_tracking() {
            self.index.contains(value)
        } else {
            self.entries().any(|entry| entry.value == *value)
        }
    }

    /// 不经过索引直接把条目放进树中，删除后的重新插入也走这里
    pub(crate) fn insert_entry(&mut self, entry: Entry<V>) -> Result<(), RTreeError> {
        // I1: 如果根节点不存在，创建根节点
        let Some(root) = self.root else {
            self.root = Some(self.arena.new_leaf(entry, None));
            self.len += 1;
            return Ok(());
        };

        // I2: 选择叶子节点
        let leaf = self.choose_leaf(root, &entry.bounding_box)?;

        // I3: 添加记录到叶子节点，边界框沿途向上扩展
        self.arena.insert_entry(leaf, entry);
        self.len += 1;

        // I4: 检查是否需要分裂并调整树
        self.handle_overflow(leaf);
        Ok(())
    }

    /// 选择叶子节点 - 遵循论文ChooseLeaf算法
    fn choose_leaf(&self, root: NodeId, bounding_box: &BoundingBox) -> Result<NodeId, RTreeError> {
        let mut current = root;
        loop {
            match &self.arena.node(current).kind {
                NodeKind::Leaf(_) => return Ok(current),
                NodeKind::Inner(children) => {
                    current = self.choose_subtree(children, bounding_box).ok_or_else(|| {
                        RTreeError::CorruptedTree(format!("inner node {current} has no children"))
                    })?;
                }
            }
        }
    }

    /// 选择子树 - 合并后面积最小的子节点，相同时选择原面积较小的
    fn choose_subtree(&self, children: &[NodeId], bounding_box: &BoundingBox) -> Option<NodeId> {
        let mut best = None;
        let mut min_area = f64::INFINITY;
        let mut min_original = f64::INFINITY;

        for &child in children {
            let child_box = self.arena.node(child).bounding_box();
            let area = child_box.union(bounding_box).area();
            let original = child_box.area();

            if best.is_none() || area < min_area || (area == min_area && original < min_original) {
                min_area = area;
                min_original = original;
                best = Some(child);
            }
        }

        best
    }

    /// 从溢出的节点开始向上分裂
    ///
    /// 非根节点分裂后用两个新节点替换它在父节点中的位置，再检查父节点；
    /// 根节点分裂时长出新的根节点，树高加一。
    fn handle_overflow(&mut self, start: NodeId) {
        let mut current = start;
        while self.splitter.need_split(&self.arena, current) {
            let Some((first, second)) = self.splitter.split(&mut self.arena, current) else {
                break;
            };
            debug!(
                strategy = self.splitter.name(),
                node = %current,
                first = self.arena.size(first),
                second = self.arena.size(second),
                "split node"
            );

            match self.arena.node(current).parent() {
                Some(parent) => {
                    self.arena.remove_child(parent, current);
                    self.arena.release(current);
                    self.arena.insert_child(parent, first);
                    self.arena.insert_child(parent, second);
                    current = parent;
                }
                None => {
                    self.arena.release(current);
                    let root = self.arena.new_inner(first, None);
                    self.arena.insert_child(root, second);
                    self.root = Some(root);
                    debug!(height = self.height(), "grew new root");
                    break;
                }
            }
        }
    }
}
