use boxtree::config::{LoggingConfig, RTreeConfig};
use boxtree::{BoundingBox, Entry, RTree, Result};
use clap::Parser;
use colored::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "rtree.toml")]
    config: String,

    /// 生成默认配置文件并退出
    #[arg(long)]
    generate_config: bool,

    /// Number of random entries to insert (overrides config file)
    #[arg(short, long)]
    entries: Option<usize>,

    /// Split strategy: linear, quadratic, exponential (overrides config file)
    #[arg(short, long)]
    split: Option<String>,

    /// Log level (overrides config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Dump the final tree as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 生成默认配置文件
    if args.generate_config {
        let config = RTreeConfig::default();
        config.save_to_file(&args.config)?;
        println!("✅ Generated default configuration: {}", args.config);
        return Ok(());
    }

    // 加载配置
    let mut config = RTreeConfig::from_file(&args.config)?;

    // 命令行参数覆盖配置文件
    if let Some(entries) = args.entries {
        config.demo.entries = entries;
    }
    if let Some(split) = args.split {
        config.tree.split = split;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    // 验证配置
    config.validate()?;

    // 初始化日志系统
    init_logging(&config.logging)?;

    info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));
    config.print_summary();

    let mut tree: RTree<u64> = config.tree.build_tree()?;
    let mut rng = StdRng::seed_from_u64(config.demo.seed);
    let range = config.demo.coordinate_range;

    println!("{}", "Inserting entries:".bold());
    for value in 0..config.demo.entries as u64 {
        let x = rng.gen_range(0.0..range).floor();
        let y = rng.gen_range(0.0..range).floor();
        let w = rng.gen_range(0.0..range).floor();
        let h = rng.gen_range(0.0..range).floor();
        println!("{}: {}:{}:{}:{}", value.to_string().cyan(), x, y, w, h);
        tree.insert(BoundingBox::new(x, y, w, h), value)?;
    }
    info!(
        entries = tree.len(),
        height = tree.height(),
        split = %config.tree.split,
        "tree built"
    );

    println!("{}", "Printing R-tree:".bold());
    print!("{}", tree.render());

    let query = config.demo.query_box()?;
    print_found(&query, &tree.find(&query));

    for value in &config.demo.remove {
        tree.remove(value);
        info!(value, "removed");
    }
    print_found(&query, &tree.find(&query));

    tree.check_invariants()?;

    if args.json {
        println!("{}", tree.export_to_json()?);
    }

    Ok(())
}

fn print_found(query: &BoundingBox, found: &[&Entry<u64>]) {
    println!(
        "{} {}",
        "Found intersected with".bold(),
        query.to_string().yellow()
    );
    if found.is_empty() {
        println!("{}", "(none)".red());
    }
    for entry in found {
        println!("{} {}", entry.bounding_box, format!("-> {}", entry.value).green());
    }
    println!();
}

/// 初始化日志系统
fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = tracing_subscriber::filter::LevelFilter::from_level(filter);

    match (config.output.as_str(), &config.log_file) {
        ("file", Some(log_file)) => {
            // 确保日志目录存在
            if let Some(parent) = log_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_target(false),
                )
                .with(level)
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .with(level)
                .init();
        }
    }
    Ok(())
}
