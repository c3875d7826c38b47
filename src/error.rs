use thiserror::Error;

/// R-tree 操作错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RTreeError {
    /// 空边界框无法被索引
    #[error("cannot insert an entry with an empty bounding box")]
    EmptyBoundingBox,

    /// 值已经存在于树中（值即唯一键）
    #[error("value is already stored in the tree")]
    DuplicateEntry,

    /// 内部不变量被破坏，说明实现有 bug
    #[error("corrupted tree: {0}")]
    CorruptedTree(String),
}
