use crate::bounding_box::BoundingBox;
use std::collections::HashMap;
use std::hash::Hash;

/// 值到边界框的辅助索引
///
/// 只用来加速删除时的定位，树本身不依赖它的正确性：
/// 查不到记录时删除会退化为扫描全部叶子。
pub trait BoxIndex<V> {
    fn get(&self, value: &V) -> Option<BoundingBox>;

    fn put(&mut self, value: V, bounding_box: BoundingBox);

    fn delete(&mut self, value: &V);

    fn contains(&self, value: &V) -> bool {
        self.get(value).is_some()
    }

    /// 已记录的值数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否真的记录数据；`false` 时树需要自己扫描叶子来判重
    fn is_tracking(&self) -> bool {
        true
    }
}

/// 基于 `HashMap` 的默认索引
#[derive(Debug, Clone)]
pub struct HashMapIndex<V> {
    boxes: HashMap<V, BoundingBox>,
}

impl<V> Default for HashMapIndex<V> {
    fn default() -> Self {
        HashMapIndex {
            boxes: HashMap::new(),
        }
    }
}

impl<V: Eq + Hash> HashMapIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: Eq + Hash> BoxIndex<V> for HashMapIndex<V> {
    fn get(&self, value: &V) -> Option<BoundingBox> {
        self.boxes.get(value).copied()
    }

    fn put(&mut self, value: V, bounding_box: BoundingBox) {
        self.boxes.insert(value, bounding_box);
    }

    fn delete(&mut self, value: &V) {
        self.boxes.remove(value);
    }

    fn contains(&self, value: &V) -> bool {
        self.boxes.contains_key(value)
    }

    fn len(&self) -> usize {
        self.boxes.len()
    }
}

/// 不记录任何内容的索引，每次删除都走全量扫描
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndex;

impl<V> BoxIndex<V> for NoIndex {
    fn get(&self, _value: &V) -> Option<BoundingBox> {
        None
    }

    fn put(&mut self, _value: V, _bounding_box: BoundingBox) {}

    fn delete(&mut self, _value: &V) {}

    fn len(&self) -> usize {
        0
    }

    fn is_tracking(&self) -> bool {
        false
    }
}
