// R-tree算法模块
//
// 这个模块包含R-tree的所有核心算法实现，按功能分解为不同的子模块：
// - search: 搜索和查询算法
// - insert: 插入和树构建算法
// - split: 节点分裂策略（线性、二次、穷举）
// - delete: 删除和树压缩算法
// - utils: 不变量检查
// - debug: 调试和文本渲染

pub mod debug;
pub mod delete;
pub mod insert;
pub mod search;
pub mod split;
pub mod utils;
