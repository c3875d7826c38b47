use crate::algorithms::split::{ExponentialSplit, SplitKind, Splitter, DEFAULT_SHUFFLE_SEED};
use crate::bounding_box::BoundingBox;
use crate::index::HashMapIndex;
use crate::rtree::{corrected_limits, RTree, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::path::PathBuf;

/// R-tree 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RTreeConfig {
    /// 树参数
    #[serde(default)]
    pub tree: TreeConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 演示程序配置
    #[serde(default)]
    pub demo: DemoConfig,
}

/// 树参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// 非根节点的最小条目数
    #[serde(default = "default_min_entries")]
    pub min_entries: usize,

    /// 节点的最大条目数
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// 分裂策略：linear, quadratic, exponential
    #[serde(default = "default_split")]
    pub split: String,

    /// 线性分裂的随机种子
    #[serde(default = "default_shuffle_seed")]
    pub shuffle_seed: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别：trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 日志输出：stdout, file
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志文件路径（当 output = file 时）
    pub log_file: Option<PathBuf>,
}

/// 演示程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// 随机生成的条目数
    #[serde(default = "default_entries")]
    pub entries: usize,

    /// 坐标和宽高的取值范围
    #[serde(default = "default_coordinate_range")]
    pub coordinate_range: f64,

    /// 生成数据的随机种子
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// 查询框 [x, y, w, h]
    #[serde(default = "default_query")]
    pub query: Vec<f64>,

    /// 查询后删除的值
    #[serde(default = "default_remove")]
    pub remove: Vec<u64>,
}

// ============================================================================
// 默认值函数
// ============================================================================

fn default_min_entries() -> usize {
    DEFAULT_MIN_ENTRIES
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_split() -> String {
    SplitKind::Linear.to_string()
}

fn default_shuffle_seed() -> u64 {
    DEFAULT_SHUFFLE_SEED
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "stdout".to_string()
}

fn default_entries() -> usize {
    100
}

fn default_coordinate_range() -> f64 {
    100.0
}

fn default_seed() -> u64 {
    7
}

fn default_query() -> Vec<f64> {
    vec![9.0, 9.0, 2.0, 2.0]
}

fn default_remove() -> Vec<u64> {
    vec![80]
}

// ============================================================================
// 实现
// ============================================================================

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_entries: default_min_entries(),
            max_entries: default_max_entries(),
            split: default_split(),
            shuffle_seed: default_shuffle_seed(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: default_log_output(),
            log_file: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            entries: default_entries(),
            coordinate_range: default_coordinate_range(),
            seed: default_seed(),
            query: default_query(),
            remove: default_remove(),
        }
    }
}

impl TreeConfig {
    /// 解析分裂策略名称
    pub fn split_kind(&self) -> Result<SplitKind, String> {
        self.split.parse()
    }

    /// 按配置创建R-tree，容量参数不合法时会被自动修正
    pub fn build_tree<V: Clone + Eq + Hash>(&self) -> crate::Result<RTree<V>> {
        let kind = self.split_kind()?;
        let splitter =
            Splitter::with_seed(kind, self.min_entries, self.max_entries, self.shuffle_seed);
        Ok(RTree::with_parts(
            self.min_entries,
            self.max_entries,
            splitter,
            HashMapIndex::new(),
        ))
    }
}

impl DemoConfig {
    /// 把 `query` 解释为 [x, y, w, h]
    pub fn query_box(&self) -> Result<BoundingBox, String> {
        match self.query.as_slice() {
            &[x, y, w, h] => Ok(BoundingBox::new(x, y, w, h)),
            other => Err(format!(
                "Demo query must have exactly 4 numbers [x, y, w, h], got {}",
                other.len()
            )),
        }
    }
}

impl RTreeConfig {
    /// 从文件加载配置
    ///
    /// 配置加载顺序（优先级从低到高）：
    /// 1. 默认配置（内嵌的 default.toml）
    /// 2. 用户配置文件（可选）
    /// 3. 环境变量（RTREE__ 前缀，使用双下划线分隔嵌套）
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use boxtree::config::RTreeConfig;
    ///
    /// // 加载配置（如果文件不存在，使用默认配置）
    /// let config = RTreeConfig::from_file("rtree.toml").unwrap();
    /// ```
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            // 1. 加载默认配置（内嵌）
            .add_source(config::File::from_str(
                include_str!("default.toml"),
                config::FileFormat::Toml,
            ))
            // 2. 加载用户配置（可选，不存在不报错）
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            // 3. 加载环境变量（RTREE__ 前缀，双下划线分隔嵌套）
            .add_source(config::Environment::with_prefix("RTREE").separator("__"))
            .build()
            .map_err(|e| format!("Failed to load config: {}", e))?;

        Ok(settings
            .try_deserialize()
            .map_err(|e| format!("Failed to parse config: {}", e))?)
    }

    /// 保存配置到文件
    ///
    /// ```no_run
    /// use boxtree::config::RTreeConfig;
    ///
    /// let config = RTreeConfig::default();
    /// config.save_to_file("rtree.toml").unwrap();
    /// ```
    pub fn save_to_file(&self, path: &str) -> crate::Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(path, toml_string)
            .map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// 验证配置
    ///
    /// 检查配置的合法性，包括：
    /// - 节点容量
    /// - 分裂策略
    /// - 日志级别和输出
    /// - 演示查询框
    pub fn validate(&self) -> Result<(), String> {
        if self.tree.min_entries == 0 {
            return Err("min_entries must be at least 1".to_string());
        }
        if self.tree.max_entries < 2 {
            return Err(format!(
                "max_entries {} is too small, must be at least 2",
                self.tree.max_entries
            ));
        }

        // 验证分裂策略
        let kind = self.tree.split_kind()?;
        let (_, max_entries) = corrected_limits(self.tree.min_entries, self.tree.max_entries);
        if kind == SplitKind::Exponential && max_entries > ExponentialSplit::MAX_ENTRIES {
            return Err(format!(
                "exponential split supports at most {} entries per node, got {}",
                ExponentialSplit::MAX_ENTRIES,
                max_entries
            ));
        }

        // 验证日志级别
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "Invalid log level: '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ))
            }
        }

        // 验证日志输出
        match self.logging.output.as_str() {
            "stdout" => {}
            "file" if self.logging.log_file.is_none() => {
                return Err("Log output is 'file' but log_file path is not specified".to_string());
            }
            "file" => {}
            other => {
                return Err(format!(
                    "Invalid log output: '{}'. Must be one of: stdout, file",
                    other
                ))
            }
        }

        if self.demo.coordinate_range <= 0.0 {
            return Err(format!(
                "coordinate_range must be positive, got {}",
                self.demo.coordinate_range
            ));
        }
        self.demo.query_box()?;

        Ok(())
    }

    /// 打印配置摘要
    pub fn print_summary(&self) {
        println!("📋 R-tree Configuration:");
        println!(
            "   Entries:     min {} / max {}",
            self.tree.min_entries, self.tree.max_entries
        );
        println!("   Split:       {}", self.tree.split);
        println!("   Shuffle Seed: {}", self.tree.shuffle_seed);
        println!();
        println!("   Log Level:   {}", self.logging.level);
        println!("   Log Output:  {}", self.logging.output);
        if let Some(ref log_file) = self.logging.log_file {
            println!("   Log File:    {}", log_file.display());
        }
        println!();
        println!(
            "   Demo:        {} entries in [0, {}), seed {}",
            self.demo.entries, self.demo.coordinate_range, self.demo.seed
        );
        println!();
    }
}
