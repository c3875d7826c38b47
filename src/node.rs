use crate::bounding_box::BoundingBox;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// 叶子条目：边界框和对应的数据值
///
/// 条目存入树后不会被修改，只能删除后重新插入。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<V> {
    pub bounding_box: BoundingBox,
    pub value: V,
}

impl<V> Entry<V> {
    pub fn new(bounding_box: BoundingBox, value: V) -> Self {
        Entry {
            bounding_box,
            value,
        }
    }
}

impl<V: PartialEq> PartialEq for Entry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.bounding_box == other.bounding_box && self.value == other.value
    }
}

/// 节点在 [`NodeArena`] 中的句柄
///
/// 只是一个槽位下标，节点被释放后对应的 `NodeId` 即失效。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "#{}", _0)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(idx: usize) -> Self {
        NodeId(idx)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0
    }
}

/// R-tree节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// 叶子节点：直接存储条目
    Leaf,
    /// 索引节点：存储子节点
    Inner,
}

/// 节点内容：叶子保存条目，索引节点保存子节点句柄
#[derive(Debug, Clone)]
pub enum NodeKind<V> {
    Leaf(Vec<Entry<V>>),
    Inner(Vec<NodeId>),
}

/// R-tree节点
#[derive(Debug, Clone)]
pub struct Node<V> {
    /// 节点的最小边界框：叶子为所有条目的并集，索引节点为所有子节点的并集
    pub(crate) bounding_box: BoundingBox,
    /// 父节点（非拥有的反向引用），根节点为 None
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind<V>,
}

impl<V> Node<V> {
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Leaf(_) => NodeType::Leaf,
            NodeKind::Inner(_) => NodeType::Inner,
        }
    }

    /// 叶子返回条目数，索引节点返回子节点数
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Inner(children) => children.len(),
        }
    }

    /// 叶子节点的条目；索引节点返回空切片
    pub fn entries(&self) -> &[Entry<V>] {
        match &self.kind {
            NodeKind::Leaf(entries) => entries,
            NodeKind::Inner(_) => &[],
        }
    }

    /// 索引节点的子节点；叶子返回空切片
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Inner(children) => children,
        }
    }
}

/// 节点存储区
///
/// 树对节点的所有权统一放在这里：索引节点通过 `NodeId` 持有子节点，
/// 子节点的 `parent` 只是一个下标，不会形成引用环。
/// 释放的槽位进入空闲链表，之后分配时复用。
#[derive(Debug, Clone)]
pub struct NodeArena<V> {
    nodes: Vec<Option<Node<V>>>,
    free_list: Vec<usize>,
}

impl<V> Default for NodeArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> NodeArena<V> {
    pub fn new() -> Self {
        NodeArena {
            nodes: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// 当前存活的节点数
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// 节点句柄是否仍然有效
    pub fn is_alive(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.idx()), Some(Some(_)))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.nodes.get(id.idx()).and_then(Option::as_ref)
    }

    /// 访问节点；句柄失效时 panic
    pub fn node(&self, id: NodeId) -> &Node<V> {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn alloc(&mut self, node: Node<V>) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            NodeId::new(idx)
        } else {
            self.nodes.push(Some(node));
            NodeId::new(self.nodes.len() - 1)
        }
    }

    /// 由单个条目创建叶子节点（尚未挂到父节点的子节点列表中）
    pub fn new_leaf(&mut self, entry: Entry<V>, parent: Option<NodeId>) -> NodeId {
        self.alloc(Node {
            bounding_box: entry.bounding_box,
            parent,
            kind: NodeKind::Leaf(vec![entry]),
        })
    }

    /// 由单个子节点创建索引节点，并把子节点的父引用指向新节点
    pub fn new_inner(&mut self, child: NodeId, parent: Option<NodeId>) -> NodeId {
        let bounding_box = self.node(child).bounding_box;
        let id = self.alloc(Node {
            bounding_box,
            parent,
            kind: NodeKind::Inner(vec![child]),
        });
        self.node_mut(child).parent = Some(id);
        id
    }

    /// 释放单个节点的槽位，返回节点内容
    pub fn release(&mut self, id: NodeId) -> Node<V> {
        let node = self.nodes[id.idx()].take().expect("dangling NodeId");
        self.free_list.push(id.idx());
        node
    }

    /// 释放整棵子树，按前序返回子树中的所有条目
    pub fn release_subtree(&mut self, id: NodeId) -> Vec<Entry<V>> {
        let mut entries = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.release(current).kind {
                NodeKind::Leaf(mut leaf_entries) => entries.append(&mut leaf_entries),
                NodeKind::Inner(children) => stack.extend(children.into_iter().rev()),
            }
        }
        entries
    }

    pub fn size(&self, id: NodeId) -> usize {
        self.node(id).size()
    }

    /// 到根节点的祖先数量，根节点深度为 0
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// 用 `bounding_box` 扩展节点及其所有祖先的边界框
    fn expand_upward(&mut self, id: NodeId, bounding_box: BoundingBox) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id);
            node.bounding_box = node.bounding_box.union(&bounding_box);
            current = node.parent;
        }
    }

    /// 向叶子节点追加条目，并把条目的边界框并入节点及所有祖先
    pub fn insert_entry(&mut self, id: NodeId, entry: Entry<V>) {
        let bounding_box = entry.bounding_box;
        let node = self.node_mut(id);
        if node.size() == 0 {
            node.kind = NodeKind::Leaf(Vec::new());
            node.bounding_box = BoundingBox::empty();
        }
        match &mut node.kind {
            NodeKind::Leaf(entries) => entries.push(entry),
            NodeKind::Inner(_) => panic!("insert_entry called on inner node {id}"),
        }
        self.expand_upward(id, bounding_box);
    }

    /// 向索引节点追加子节点，更新子节点的父引用，并向上扩展边界框
    pub fn insert_child(&mut self, id: NodeId, child: NodeId) {
        let bounding_box = self.node(child).bounding_box;
        let node = self.node_mut(id);
        if node.size() == 0 {
            node.kind = NodeKind::Inner(Vec::new());
            node.bounding_box = BoundingBox::empty();
        }
        match &mut node.kind {
            NodeKind::Inner(children) => children.push(child),
            NodeKind::Leaf(_) => panic!("insert_child called on leaf node {id}"),
        }
        self.node_mut(child).parent = Some(id);
        self.expand_upward(id, bounding_box);
    }

    /// 从子节点列表中移除 `child`，随后重建边界框直到根
    ///
    /// 被移除的子节点不再有父引用，但仍然占用槽位，由调用方决定是否释放。
    pub fn remove_child(&mut self, id: NodeId, child: NodeId) -> bool {
        let removed = match &mut self.node_mut(id).kind {
            NodeKind::Inner(children) => {
                let before = children.len();
                children.retain(|c| *c != child);
                children.len() != before
            }
            NodeKind::Leaf(_) => false,
        };
        if removed {
            self.node_mut(child).parent = None;
        }
        self.update_bounding_boxes(id);
        removed
    }

    /// 根据当前内容重新计算单个节点的边界框
    ///
    /// 节点为空时保留原值。
    fn update_bounding_box(&mut self, id: NodeId) {
        let node = self.node(id);
        let bounding_box = match &node.kind {
            NodeKind::Leaf(entries) if entries.is_empty() => return,
            NodeKind::Inner(children) if children.is_empty() => return,
            NodeKind::Leaf(entries) => entries
                .iter()
                .fold(BoundingBox::empty(), |acc, e| acc.union(&e.bounding_box)),
            NodeKind::Inner(children) => children.iter().fold(BoundingBox::empty(), |acc, c| {
                acc.union(&self.node(*c).bounding_box)
            }),
        };
        self.node_mut(id).bounding_box = bounding_box;
    }

    /// 从节点开始一路重建到根
    ///
    /// 收缩无法用增量并集表达，所以每一层都从子项完整重算。
    pub fn update_bounding_boxes(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            self.update_bounding_box(node_id);
            current = self.node(node_id).parent;
        }
    }
}

impl<V: PartialEq> NodeArena<V> {
    /// 删除与 `entry` 完全相等的条目（边界框与值都相等）
    pub fn remove_entry(&mut self, id: NodeId, entry: &Entry<V>) -> bool {
        self.remove_entries_where(id, |e| e == entry)
    }

    /// 删除值等于 `value` 的条目
    pub fn remove_entry_by_value(&mut self, id: NodeId, value: &V) -> bool {
        self.remove_entries_where(id, |e| e.value == *value)
    }

    fn remove_entries_where<F>(&mut self, id: NodeId, mut predicate: F) -> bool
    where
        F: FnMut(&Entry<V>) -> bool,
    {
        let removed = match &mut self.node_mut(id).kind {
            NodeKind::Leaf(entries) => {
                let before = entries.len();
                entries.retain(|e| !predicate(e));
                entries.len() != before
            }
            NodeKind::Inner(_) => false,
        };
        self.update_bounding_boxes(id);
        removed
    }
}
