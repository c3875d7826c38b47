use crate::algorithms::split::SplitStrategy;
use crate::index::BoxIndex;
use crate::rtree::RTree;
use std::fmt::{Display, Write};

/// R-tree调试功能实现
impl<V, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 按前序把整棵树渲染成文本
    ///
    /// 每个节点一行，缩进为深度的两倍；叶子节点的条目紧跟在节点之后，以 `.` 开头。
    pub fn render(&self) -> String {
        let mut out = String::new();
        for view in self.iter() {
            let indent = "  ".repeat(view.depth());
            let _ = writeln!(out, "{indent}{}", view.bounding_box());
            for entry in view.entries() {
                let _ = writeln!(out, "{indent}.{}", entry.bounding_box);
            }
        }
        out
    }
}

impl<V: Display, S: SplitStrategy, I: BoxIndex<V>> RTree<V, S, I> {
    /// 打印完整的树结构用于调试
    ///
    /// 包括节点句柄、类型、深度、边界框和条目数量，以及叶子中的每个值
    pub fn print_tree_structure(&self) {
        println!("=== R-tree Structure Debug ===");
        if self.is_empty() {
            println!("Empty tree (no root)");
        }
        for view in self.iter() {
            let indent = "  ".repeat(view.depth());
            println!(
                "{}Node{} (depth={}, type={:?}, box={}, {} items):",
                indent,
                view.id(),
                view.depth(),
                view.node_type(),
                view.bounding_box(),
                view.size()
            );
            if view.size() == 0 {
                println!("{}  ❌ EMPTY NODE!", indent);
            }
            for (i, entry) in view.entries().iter().enumerate() {
                println!("{}  [{}] {} at {}", indent, i, entry.value, entry.bounding_box);
            }
        }
        println!("=== End Debug ===");
    }
}
