use crate::bounding_box::BoundingBox;
use crate::node::{Entry, NodeArena, NodeId, NodeKind};
use derive_more::Display;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 线性分裂打乱剩余条目时使用的默认随机种子
pub const DEFAULT_SHUFFLE_SEED: u64 = 42;

/// 节点分裂策略
///
/// 具体策略只需要实现 `partition`：给定溢出节点中所有条目（或子节点）的边界框，
/// 把下标分成两组，每组的第一个下标是该组的种子。
/// 把条目真正搬到两个新节点的工作由默认的 `split` 统一完成。
pub trait SplitStrategy {
    /// 策略名称，用于日志和导出
    fn name(&self) -> &'static str;

    fn min_entries(&self) -> usize;

    fn max_entries(&self) -> usize;

    /// 更新节点容量限制，由树在修正参数后调用
    fn set_limits(&mut self, min_entries: usize, max_entries: usize);

    /// 策略能处理的最大节点容量，None 表示不限制
    fn max_capacity(&self) -> Option<usize> {
        None
    }

    /// 把 `boxes` 的下标分成两个非空组，不丢失也不重复
    fn partition(&self, boxes: &[BoundingBox]) -> (Vec<usize>, Vec<usize>);

    /// 节点条目数超过最大值时需要分裂
    fn need_split<V>(&self, arena: &NodeArena<V>, id: NodeId) -> bool {
        arena.size(id) > self.max_entries()
    }

    /// 分裂节点
    ///
    /// 返回两个新分配的节点，它们继承原节点的父引用但还没有挂到父节点下。
    /// 原节点的内容被搬空，由调用方负责从父节点摘下并释放。
    /// 节点大小不超过 1 时无需分裂，返回 None。
    fn split<V>(&self, arena: &mut NodeArena<V>, id: NodeId) -> Option<(NodeId, NodeId)> {
        let node = arena.node(id);
        if node.size() <= 1 {
            return None;
        }
        let parent = node.parent;
        let boxes: Vec<BoundingBox> = match &node.kind {
            NodeKind::Leaf(entries) => entries.iter().map(|e| e.bounding_box).collect(),
            NodeKind::Inner(children) => children
                .iter()
                .map(|&child| arena.node(child).bounding_box)
                .collect(),
        };

        let (first, second) = self.partition(&boxes);
        debug_assert_eq!(first.len() + second.len(), boxes.len());

        let kind = std::mem::replace(&mut arena.node_mut(id).kind, NodeKind::Inner(Vec::new()));
        let pair = match kind {
            NodeKind::Leaf(entries) => {
                let mut slots: Vec<Option<Entry<V>>> = entries.into_iter().map(Some).collect();
                (
                    build_leaf(arena, &mut slots, &first, parent),
                    build_leaf(arena, &mut slots, &second, parent),
                )
            }
            NodeKind::Inner(children) => (
                build_inner(arena, &children, &first, parent),
                build_inner(arena, &children, &second, parent),
            ),
        };
        Some(pair)
    }
}

fn build_leaf<V>(
    arena: &mut NodeArena<V>,
    slots: &mut [Option<Entry<V>>],
    group: &[usize],
    parent: Option<NodeId>,
) -> NodeId {
    let mut items = group.iter().filter_map(|&i| slots[i].take());
    let seed = items.next().expect("split group must not be empty");
    let id = arena.new_leaf(seed, parent);
    for entry in items {
        arena.insert_entry(id, entry);
    }
    id
}

fn build_inner<V>(
    arena: &mut NodeArena<V>,
    children: &[NodeId],
    group: &[usize],
    parent: Option<NodeId>,
) -> NodeId {
    let (&seed, rest) = group.split_first().expect("split group must not be empty");
    let id = arena.new_inner(children[seed], parent);
    for &i in rest {
        arena.insert_child(id, children[i]);
    }
    id
}

/// 每组至少要分到的数量：不超过 min_entries，也不超过总数的一半
fn min_fill(min_entries: usize, total: usize) -> usize {
    min_entries.min(total / 2).max(1)
}

/// 分裂过程中两个正在增长的分组
struct Groups {
    members: [Vec<usize>; 2],
    boxes: [BoundingBox; 2],
}

impl Groups {
    fn new(boxes: &[BoundingBox], seed1: usize, seed2: usize) -> Self {
        Groups {
            members: [vec![seed1], vec![seed2]],
            boxes: [boxes[seed1], boxes[seed2]],
        }
    }

    fn push(&mut self, group: usize, index: usize, bounding_box: &BoundingBox) {
        self.members[group].push(index);
        self.boxes[group] = self.boxes[group].union(bounding_box);
    }

    /// 剩余条目必须全部给某一组才能让它达到最小填充时，返回该组
    fn forced(&self, pending: usize, min_fill: usize) -> Option<usize> {
        (0..2).find(|&g| self.members[g].len() < min_fill && self.members[g].len() + pending <= min_fill)
    }

    /// 加入后两组各自的面积
    fn resulting_areas(&self, bounding_box: &BoundingBox) -> (f64, f64) {
        (
            self.boxes[0].union(bounding_box).area(),
            self.boxes[1].union(bounding_box).area(),
        )
    }

    fn into_pair(self) -> (Vec<usize>, Vec<usize>) {
        let [first, second] = self.members;
        (first, second)
    }
}

/// 线性分裂
///
/// 以距离最远的一对作为种子，其余条目随机打乱后逐个贪心分配到
/// 加入后面积较小的一组，面积相等时分到第一组。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearSplit {
    min_entries: usize,
    max_entries: usize,
    seed: u64,
}

impl LinearSplit {
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        Self::with_seed(min_entries, max_entries, DEFAULT_SHUFFLE_SEED)
    }

    pub fn with_seed(min_entries: usize, max_entries: usize, seed: u64) -> Self {
        LinearSplit {
            min_entries,
            max_entries,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 两两比较距离，返回最远的一对
    fn pick_seeds(boxes: &[BoundingBox]) -> (usize, usize) {
        let mut max_distance = -1.0;
        let mut best_pair = (0, 1);
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                let d = boxes[i].distance(&boxes[j]);
                if d > max_distance {
                    max_distance = d;
                    best_pair = (i, j);
                }
            }
        }
        best_pair
    }
}

impl SplitStrategy for LinearSplit {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn min_entries(&self) -> usize {
        self.min_entries
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn set_limits(&mut self, min_entries: usize, max_entries: usize) {
        self.min_entries = min_entries;
        self.max_entries = max_entries;
    }

    fn partition(&self, boxes: &[BoundingBox]) -> (Vec<usize>, Vec<usize>) {
        let (seed1, seed2) = Self::pick_seeds(boxes);
        let mut rest: Vec<usize> = (0..boxes.len())
            .filter(|&i| i != seed1 && i != seed2)
            .collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        rest.shuffle(&mut rng);

        let fill = min_fill(self.min_entries, boxes.len());
        let mut groups = Groups::new(boxes, seed1, seed2);
        for (placed, &i) in rest.iter().enumerate() {
            let group = match groups.forced(rest.len() - placed, fill) {
                Some(group) => group,
                None => {
                    let (area1, area2) = groups.resulting_areas(&boxes[i]);
                    if area1 <= area2 {
                        0
                    } else {
                        1
                    }
                }
            };
            groups.push(group, i, &boxes[i]);
        }
        groups.into_pair()
    }
}

/// 二次分裂（Guttman QuadraticSplit）
///
/// 种子为死空间最大的一对；之后每一轮挑选对两组偏好差异最大的条目，
/// 放入加入后面积较小的组。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadraticSplit {
    min_entries: usize,
    max_entries: usize,
}

impl QuadraticSplit {
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        QuadraticSplit {
            min_entries,
            max_entries,
        }
    }

    /// 死空间 = 并集面积 + 交集面积 - 两者各自面积
    fn dead_space(a: &BoundingBox, b: &BoundingBox) -> f64 {
        a.union(b).area() + a.intersection(b).area() - a.area() - b.area()
    }

    fn pick_seeds(boxes: &[BoundingBox]) -> (usize, usize) {
        let mut max_waste = f64::NEG_INFINITY;
        let mut best_pair = (0, 1);
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                let waste = Self::dead_space(&boxes[i], &boxes[j]);
                if waste > max_waste {
                    max_waste = waste;
                    best_pair = (i, j);
                }
            }
        }
        best_pair
    }

    /// 返回偏好差异最大的条目在 `pending` 中的位置
    fn pick_next(pending: &[usize], boxes: &[BoundingBox], groups: &Groups) -> usize {
        let mut max_preference = f64::NEG_INFINITY;
        let mut best = 0;
        for (k, &i) in pending.iter().enumerate() {
            let enlargement1 = groups.boxes[0].enlargement(&boxes[i]);
            let enlargement2 = groups.boxes[1].enlargement(&boxes[i]);
            let preference = (enlargement1 - enlargement2).abs();
            if preference > max_preference {
                max_preference = preference;
                best = k;
            }
        }
        best
    }

    /// 面积较小的组优先；面积相同时看组面积，再看条目数
    fn preferred_group(groups: &Groups, bounding_box: &BoundingBox) -> usize {
        let (area1, area2) = groups.resulting_areas(bounding_box);
        if area1 != area2 {
            return if area1 < area2 { 0 } else { 1 };
        }
        let (group_area1, group_area2) = (groups.boxes[0].area(), groups.boxes[1].area());
        if group_area1 != group_area2 {
            return if group_area1 < group_area2 { 0 } else { 1 };
        }
        if groups.members[1].len() < groups.members[0].len() {
            1
        } else {
            0
        }
    }
}

impl SplitStrategy for QuadraticSplit {
    fn name(&self) -> &'static str {
        "quadratic"
    }

    fn min_entries(&self) -> usize {
        self.min_entries
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn set_limits(&mut self, min_entries: usize, max_entries: usize) {
        self.min_entries = min_entries;
        self.max_entries = max_entries;
    }

    fn partition(&self, boxes: &[BoundingBox]) -> (Vec<usize>, Vec<usize>) {
        let (seed1, seed2) = Self::pick_seeds(boxes);
        let mut pending: Vec<usize> = (0..boxes.len())
            .filter(|&i| i != seed1 && i != seed2)
            .collect();

        let fill = min_fill(self.min_entries, boxes.len());
        let mut groups = Groups::new(boxes, seed1, seed2);
        while !pending.is_empty() {
            if let Some(group) = groups.forced(pending.len(), fill) {
                for i in pending.drain(..) {
                    groups.push(group, i, &boxes[i]);
                }
                break;
            }
            let i = pending.remove(Self::pick_next(&pending, boxes, &groups));
            let group = Self::preferred_group(&groups, &boxes[i]);
            groups.push(group, i, &boxes[i]);
        }
        groups.into_pair()
    }
}

/// 穷举分裂
///
/// 在所有可能的两组划分中选出两组面积之和最小的一个。
/// 条目的任意排列加任意切分点得到的正是所有有序划分，这里直接枚举划分，
/// 复杂度仍是 O(2^n)，最大条目数超过 4 左右就不实用，只适合作为小规模的最优基准。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialSplit {
    min_entries: usize,
    max_entries: usize,
}

impl ExponentialSplit {
    /// 可以穷举的最大条目数
    pub const MAX_ITEMS: usize = 32;

    /// 树使用穷举分裂时允许的最大节点容量，溢出节点最多 13 项，每次分裂枚举 4096 种划分
    pub const MAX_ENTRIES: usize = 12;

    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        ExponentialSplit {
            min_entries,
            max_entries,
        }
    }
}

impl SplitStrategy for ExponentialSplit {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn min_entries(&self) -> usize {
        self.min_entries
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn set_limits(&mut self, min_entries: usize, max_entries: usize) {
        self.min_entries = min_entries;
        self.max_entries = max_entries;
    }

    fn max_capacity(&self) -> Option<usize> {
        Some(Self::MAX_ENTRIES)
    }

    fn partition(&self, boxes: &[BoundingBox]) -> (Vec<usize>, Vec<usize>) {
        let n = boxes.len();
        assert!(
            n <= Self::MAX_ITEMS,
            "exponential split cannot enumerate {n} items"
        );
        let fill = min_fill(self.min_entries, n);

        // 第 0 项固定在第一组，掩码的第 k 位表示第 k + 1 项放进第二组
        let mut best_mask = None;
        let mut best_area = f64::INFINITY;
        for mask in 0u64..(1u64 << (n - 1)) {
            let second = mask.count_ones() as usize;
            if second < fill || n - second < fill {
                continue;
            }
            let mut group_boxes = [BoundingBox::empty(); 2];
            for (i, bounding_box) in boxes.iter().enumerate() {
                let g = if i > 0 && mask & (1 << (i - 1)) != 0 { 1 } else { 0 };
                group_boxes[g] = group_boxes[g].union(bounding_box);
            }
            let area = group_boxes[0].area() + group_boxes[1].area();
            if area < best_area {
                best_area = area;
                best_mask = Some(mask);
            }
        }

        // 没有满足填充要求的划分时（只可能在 n < 2 时发生）把最后一项单独分出
        let mask = best_mask.unwrap_or(1u64 << (n.saturating_sub(2)));
        (0..n).partition(|&i| i == 0 || mask & (1 << (i - 1)) == 0)
    }
}

/// 可在运行时选择的分裂策略种类
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    #[default]
    #[display(fmt = "linear")]
    Linear,
    #[display(fmt = "quadratic")]
    Quadratic,
    #[display(fmt = "exponential")]
    Exponential,
}

impl SplitKind {
    pub const ALL: [SplitKind; 3] = [SplitKind::Linear, SplitKind::Quadratic, SplitKind::Exponential];
}

impl FromStr for SplitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(SplitKind::Linear),
            "quadratic" => Ok(SplitKind::Quadratic),
            "exponential" => Ok(SplitKind::Exponential),
            other => Err(format!(
                "unknown split strategy '{other}', expected linear, quadratic or exponential"
            )),
        }
    }
}

/// 三种分裂策略的封闭集合，由树在运行时分派
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Splitter {
    Linear(LinearSplit),
    Quadratic(QuadraticSplit),
    Exponential(ExponentialSplit),
}

impl Default for Splitter {
    fn default() -> Self {
        Splitter::Linear(LinearSplit::new(2, 10))
    }
}

impl Splitter {
    pub fn new(kind: SplitKind, min_entries: usize, max_entries: usize) -> Self {
        Self::with_seed(kind, min_entries, max_entries, DEFAULT_SHUFFLE_SEED)
    }

    /// `seed` 只对线性分裂有效
    pub fn with_seed(kind: SplitKind, min_entries: usize, max_entries: usize, seed: u64) -> Self {
        match kind {
            SplitKind::Linear => {
                Splitter::Linear(LinearSplit::with_seed(min_entries, max_entries, seed))
            }
            SplitKind::Quadratic => Splitter::Quadratic(QuadraticSplit::new(min_entries, max_entries)),
            SplitKind::Exponential => {
                Splitter::Exponential(ExponentialSplit::new(min_entries, max_entries))
            }
        }
    }

    pub fn kind(&self) -> SplitKind {
        match self {
            Splitter::Linear(_) => SplitKind::Linear,
            Splitter::Quadratic(_) => SplitKind::Quadratic,
            Splitter::Exponential(_) => SplitKind::Exponential,
        }
    }
}

impl SplitStrategy for Splitter {
    fn name(&self) -> &'static str {
        match self {
            Splitter::Linear(s) => s.name(),
            Splitter::Quadratic(s) => s.name(),
            Splitter::Exponential(s) => s.name(),
        }
    }

    fn min_entries(&self) -> usize {
        match self {
            Splitter::Linear(s) => s.min_entries(),
            Splitter::Quadratic(s) => s.min_entries(),
            Splitter::Exponential(s) => s.min_entries(),
        }
    }

    fn max_entries(&self) -> usize {
        match self {
            Splitter::Linear(s) => s.max_entries(),
            Splitter::Quadratic(s) => s.max_entries(),
            Splitter::Exponential(s) => s.max_entries(),
        }
    }

    fn set_limits(&mut self, min_entries: usize, max_entries: usize) {
        match self {
            Splitter::Linear(s) => s.set_limits(min_entries, max_entries),
            Splitter::Quadratic(s) => s.set_limits(min_entries, max_entries),
            Splitter::Exponential(s) => s.set_limits(min_entries, max_entries),
        }
    }

    fn max_capacity(&self) -> Option<usize> {
        match self {
            Splitter::Linear(s) => s.max_capacity(),
            Splitter::Quadratic(s) => s.max_capacity(),
            Splitter::Exponential(s) => s.max_capacity(),
        }
    }

    fn partition(&self, boxes: &[BoundingBox]) -> (Vec<usize>, Vec<usize>) {
        match self {
            Splitter::Linear(s) => s.partition(boxes),
            Splitter::Quadratic(s) => s.partition(boxes),
            Splitter::Exponential(s) => s.partition(boxes),
        }
    }
}
