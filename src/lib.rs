//! 动态 R-tree 空间索引
//!
//! 以二维轴对齐矩形为键，支持插入、删除和矩形相交查询，
//! 节点分裂策略可在线性、二次和穷举三种之间选择。

pub mod algorithms;
pub mod bounding_box;
pub mod config;
pub mod error;
pub mod index;
pub mod node;
pub mod rtree;

use std::error::Error;

// 重新导出主要的公共接口
pub use algorithms::split::{
    ExponentialSplit, LinearSplit, QuadraticSplit, SplitKind, SplitStrategy, Splitter,
};
pub use bounding_box::{BoundingBox, Point, Segment};
pub use config::RTreeConfig;
pub use error::RTreeError;
pub use index::{BoxIndex, HashMapIndex, NoIndex};
pub use node::{Entry, NodeId, NodeType};
pub use rtree::{NodeView, Nodes, RTree, TreeVisualization};

pub type Result<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;
