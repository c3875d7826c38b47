use crate::algorithms::split::{SplitKind, SplitStrategy, Splitter};
use crate::bounding_box::BoundingBox;
use crate::index::{BoxIndex, HashMapIndex};
use crate::node::{Entry, Node, NodeArena, NodeId, NodeType};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use tracing::warn;

/// 默认最小条目数
pub const DEFAULT_MIN_ENTRIES: usize = 2;
/// 默认最大条目数
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// 修正节点容量参数：`min >= 1` 且 `min * 2 <= max`
///
/// 最小值不合法时提升到 1；最大值不足时提升到最小值的两倍。
pub fn corrected_limits(min_entries: usize, max_entries: usize) -> (usize, usize) {
    let min_entries = min_entries.max(1);
    let max_entries = max_entries.max(min_entries * 2);
    (min_entries, max_entries)
}

/// 用于JSON序列化的简化树结构
#[derive(Debug, Serialize, Deserialize)]
pub struct TreeVisualization<V> {
    /// 根节点（如果存在）
    pub root: Option<NodeVisualization<V>>,
    /// 树的配置参数
    pub config: TreeLimits,
}

/// 用于JSON序列化的树配置
#[derive(Debug, Serialize, Deserialize)]
pub struct TreeLimits {
    pub min_entries: usize,
    pub max_entries: usize,
    pub split: String,
}

/// 用于JSON序列化的节点结构
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeVisualization<V> {
    pub bounding_box: BoundingBox,
    pub node_type: NodeType,
    pub depth: usize,
    /// 数据条目（仅叶子节点）
    pub entries: Vec<Entry<V>>,
    /// 子节点（仅索引节点）
    pub children: Vec<NodeVisualization<V>>,
}

/// R-tree主结构
///
/// 节点全部存放在 `arena` 中，树只记录根节点的句柄。
/// `index` 记录每个值当前的边界框，用来在删除时直接定位叶子。
#[derive(Debug, Clone)]
pub struct RTree<V, S = Splitter, I = HashMapIndex<V>> {
    pub(crate) arena: NodeArena<V>,
    pub(crate) root: Option<NodeId>,
    pub(crate) index: I,
    pub(crate) splitter: S,
    min_entries: usize,
    max_entries: usize,
    /// 已存储的条目数
    pub(crate) len: usize,
}

impl<V: Clone + Eq + Hash> RTree<V> {
    /// 创建使用线性分裂的R-tree，非法参数会被自动修正
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        Self::with_split(SplitKind::Linear, min_entries, max_entries)
    }

    /// 使用指定的分裂策略创建R-tree
    pub fn with_split(kind: SplitKind, min_entries: usize, max_entries: usize) -> Self {
        RTree::with_parts(
            min_entries,
            max_entries,
            Splitter::new(kind, min_entries, max_entries),
            HashMapIndex::new(),
        )
    }
}

impl<V: Clone + Eq + Hash> Default for RTree<V> {
    /// 使用默认参数创建R-tree（m=2, M=10）
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ENTRIES, DEFAULT_MAX_ENTRIES)
    }
}

impl<V, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 由分裂策略和索引组装R-tree
    ///
    /// 修正后的容量参数会同步写回分裂策略。
    /// 分裂策略声明了最大容量时（穷举分裂），最大值被压到该容量，最小值不超过它的一半。
    pub fn with_parts(min_entries: usize, max_entries: usize, mut splitter: S, index: I) -> Self {
        let (mut min_entries, mut max_entries) = corrected_limits(min_entries, max_entries);
        if let Some(capacity) = splitter.max_capacity() {
            if max_entries > capacity {
                warn!(
                    strategy = splitter.name(),
                    requested = max_entries,
                    capacity,
                    "max_entries exceeds split strategy capacity, clamping"
                );
                max_entries = capacity;
                min_entries = min_entries.min(capacity / 2).max(1);
            }
        }
        splitter.set_limits(min_entries, max_entries);
        RTree {
            arena: NodeArena::new(),
            root: None,
            index,
            splitter,
            min_entries,
            max_entries,
            len: 0,
        }
    }

    /// 检查R-tree是否为空
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// 获取总的条目数量
    pub fn len(&self) -> usize {
        self.len
    }

    /// 获取最小条目数
    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// 获取最大条目数
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// 获取树的层数，空树为 0
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = self.arena.node(id).children().first().copied();
        }
        height
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    /// 获取根节点的边界框，空树返回 None
    pub fn root_bounding_box(&self) -> Option<BoundingBox> {
        self.root.map(|id| self.arena.node(id).bounding_box())
    }

    pub fn strategy(&self) -> &S {
        &self.splitter
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// 查看单个节点；句柄失效时返回 None
    pub fn node(&self, id: NodeId) -> Option<NodeView<'_, V>> {
        self.arena.get(id).map(|node| NodeView {
            id,
            node,
            depth: self.arena.depth(id),
        })
    }

    /// 按前序遍历所有节点：先根节点，再按顺序深度优先访问子节点
    ///
    /// 迭代器借用整棵树，遍历期间不能修改树。
    pub fn iter(&self) -> Nodes<'_, V> {
        Nodes {
            arena: &self.arena,
            stack: self.root.map(|id| (id, 0)).into_iter().collect(),
        }
    }

    /// 按前序返回所有条目
    pub fn entries(&self) -> impl Iterator<Item = &Entry<V>> {
        self.iter().flat_map(|view| view.entries().iter())
    }
}

impl<V: Serialize + Clone, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 导出树结构为JSON格式
    ///
    /// 返回包含完整树结构的JSON字符串，用于前端可视化
    pub fn export_to_json(&self) -> Result<String, serde_json::Error> {
        let visualization = self.create_tree_visualization();
        serde_json::to_string_pretty(&visualization)
    }

    /// 创建用于可视化的树结构
    fn create_tree_visualization(&self) -> TreeVisualization<V> {
        TreeVisualization {
            root: self.root.map(|id| self.create_node_visualization(id, 0)),
            config: TreeLimits {
                min_entries: self.min_entries,
                max_entries: self.max_entries,
                split: self.splitter.name().to_string(),
            },
        }
    }

    /// 递归创建节点的可视化结构
    fn create_node_visualization(&self, id: NodeId, depth: usize) -> NodeVisualization<V> {
        let node = self.arena.node(id);
        NodeVisualization {
            bounding_box: node.bounding_box(),
            node_type: node.node_type(),
            depth,
            entries: node.entries().to_vec(),
            children: node
                .children()
                .iter()
                .map(|&child| self.create_node_visualization(child, depth + 1))
                .collect(),
        }
    }
}

/// 节点的只读视图
pub struct NodeView<'a, V> {
    id: NodeId,
    node: &'a Node<V>,
    depth: usize,
}

impl<V> Clone for NodeView<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for NodeView<'_, V> {}

impl<'a, V> NodeView<'a, V> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.node.bounding_box()
    }

    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type()
    }

    pub fn size(&self) -> usize {
        self.node.size()
    }

    /// 根节点深度为 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent()
    }

    pub fn entries(&self) -> &'a [Entry<V>] {
        self.node.entries()
    }

    pub fn children(&self) -> &'a [NodeId] {
        self.node.children()
    }
}

impl<V> std::fmt::Debug for NodeView<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeView")
            .field("id", &self.id)
            .field("bounding_box", &self.bounding_box())
            .field("node_type", &self.node_type())
            .field("size", &self.size())
            .field("depth", &self.depth)
            .field("parent", &self.parent())
            .finish()
    }
}

/// 前序节点迭代器，用显式栈避免递归
pub struct Nodes<'a, V> {
    arena: &'a NodeArena<V>,
    stack: Vec<(NodeId, usize)>,
}

impl<'a, V> Iterator for Nodes<'a, V> {
    type Item = NodeView<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let node = self.arena.node(id);
        self.stack
            .extend(node.children().iter().rev().map(|&child| (child, depth + 1)));
        Some(NodeView { id, node, depth })
    }
}

impl<'a, V, S: SplitStrategy, I: BoxIndex<V>> IntoIterator for &'a RTree<V, S, I> {
    type Item = NodeView<'a, V>;
    type IntoIter = Nodes<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NoIndex;

    #[test]
    fn test_rtree_creation() {
        let rtree: RTree<i32> = RTree::default();
        assert_eq!(rtree.min_entries(), 2);
        assert_eq!(rtree.max_entries(), 10);
        assert!(rtree.is_empty());
        assert_eq!(rtree.len(), 0);
        assert_eq!(rtree.height(), 0);
        assert!(rtree.root_bounding_box().is_none());
        assert_eq!(rtree.iter().count(), 0);
    }

    #[test]
    fn test_custom_limits() {
        let rtree: RTree<i32> = RTree::new(20, 100);
        assert_eq!(rtree.min_entries(), 20);
        assert_eq!(rtree.max_entries(), 100);
        assert_eq!(rtree.strategy().max_entries(), 100);
    }

    #[test]
    fn test_limits_are_corrected() {
        assert_eq!(corrected_limits(0, 10), (1, 10));
        assert_eq!(corrected_limits(6, 10), (6, 12));
        assert_eq!(corrected_limits(0, 0), (1, 2));

        let rtree: RTree<i32> = RTree::with_split(SplitKind::Quadratic, 5, 4);
        assert_eq!((rtree.min_entries(), rtree.max_entries()), (5, 10));
        assert_eq!(rtree.strategy().min_entries(), 5);
        assert_eq!(rtree.strategy().max_entries(), 10);
    }

    #[test]
    fn test_exponential_capacity_is_clamped() {
        let rtree: RTree<i32> = RTree::with_split(SplitKind::Exponential, 2, 40);
        assert_eq!((rtree.min_entries(), rtree.max_entries()), (2, 12));
        assert_eq!(rtree.strategy().max_entries(), 12);

        let rtree: RTree<i32> = RTree::with_split(SplitKind::Exponential, 9, 4);
        assert_eq!((rtree.min_entries(), rtree.max_entries()), (6, 12));

        // 其他策略不受限制
        let rtree: RTree<i32> = RTree::with_split(SplitKind::Linear, 2, 40);
        assert_eq!(rtree.max_entries(), 40);
    }

    #[test]
    fn test_exponential_large_capacity_inserts() {
        let mut rtree: RTree<usize> = RTree::with_split(SplitKind::Exponential, 2, 40);
        for i in 0..41 {
            let v = i as f64;
            rtree.insert(BoundingBox::new(v, v, 1.0, 1.0), i).unwrap();
        }
        assert_eq!(rtree.len(), 41);
        assert!(rtree.height() > 1);
        rtree.check_invariants().unwrap();
    }

    #[test]
    fn test_single_entry_tree() {
        let mut rtree: RTree<i32> = RTree::default();
        let bounding_box = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        rtree.insert(bounding_box, 0).unwrap();

        let nodes: Vec<_> = rtree.iter().collect();
        assert_eq!(nodes.len(), 1);
        let root = nodes[0];
        assert!(root.is_leaf());
        assert_eq!(root.size(), 1);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.parent(), None);
        assert_eq!(root.bounding_box(), bounding_box);
        assert_eq!(Some(root.id()), rtree.root_id());
        assert_eq!(rtree.height(), 1);
        assert_eq!(rtree.len(), 1);
    }

    #[test]
    fn test_iteration_is_pre_order() {
        let mut rtree = RTree::new(1, 2);
        for i in 0..6 {
            let x = i as f64 * 3.0;
            rtree.insert(BoundingBox::new(x, x, 1.0, 1.0), i).unwrap();
        }

        let nodes: Vec<_> = rtree.iter().collect();
        assert_eq!(nodes[0].id(), rtree.root_id().unwrap());
        assert_eq!(nodes[0].depth(), 0);
        // 每个节点的父节点都出现在它之前，且深度恰好小 1
        for (i, view) in nodes.iter().enumerate().skip(1) {
            let parent = view.parent().expect("non-root node has a parent");
            let pos = nodes[..i].iter().position(|n| n.id() == parent).expect("parent first");
            assert_eq!(nodes[pos].depth() + 1, view.depth());
            assert_eq!(rtree.node(view.id()).unwrap().depth(), view.depth());
        }
        let leaf_entries: usize = nodes.iter().filter(|n| n.is_leaf()).map(|n| n.size()).sum();
        assert_eq!(leaf_entries, 6);
        assert_eq!(rtree.entries().count(), 6);
        assert_eq!((&rtree).into_iter().count(), nodes.len());
    }

    #[test]
    fn test_with_parts_and_no_index() {
        let mut rtree: RTree<u32, Splitter, NoIndex> =
            RTree::with_parts(2, 4, Splitter::new(SplitKind::Exponential, 2, 4), NoIndex);
        for i in 0..5u32 {
            let v = i as f64 * 0.1;
            rtree.insert(BoundingBox::new(v, v, 0.2, 0.2), i).unwrap();
        }
        assert_eq!(rtree.len(), 5);
        assert_eq!(BoxIndex::<u32>::len(rtree.index()), 0);
        assert!(!rtree.iter().next().unwrap().is_leaf());
    }

    #[test]
    fn test_json_export() {
        let mut rtree = RTree::new(1, 3);
        for i in 0..10 {
            let x = (i as f64) * 10.0;
            let y = (i as f64) * 5.0;
            rtree.insert(BoundingBox::new(x, y, 5.0, 5.0), i.to_string()).unwrap();
        }

        let json = rtree.export_to_json().expect("Failed to export JSON");
        assert!(json.contains("\"max_entries\": 3"));
        assert!(json.contains("\"min_entries\": 1"));
        assert!(json.contains("\"split\": \"linear\""));

        let parsed: TreeVisualization<String> = serde_json::from_str(&json).unwrap();
        let root = parsed.root.expect("tree is not empty");
        assert_eq!(root.node_type, NodeType::Inner);
        assert_eq!(root.depth, 0);
        assert!(root.entries.is_empty());
    }

    #[test]
    fn test_json_export_empty_tree() {
        let rtree: RTree<String> = RTree::default();
        let parsed: TreeVisualization<String> =
            serde_json::from_str(&rtree.export_to_json().unwrap()).unwrap();
        assert!(parsed.root.is_none());
        assert_eq!(parsed.config.max_entries, 10);
    }
}
