//! # 示例应用程序
//!
//! 演示如何使用 Lorn DI 声明模块、注入属性并解析组件

use anyhow::Context as _;
use clap::Parser;
use di_abstractions::{BeanDefinition, Declaration, Module};
use di_composition::{init_logging, Container, DependencyError, LoggingConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn DI 示例应用")]
struct Args {
    /// 属性文件路径（toml / json / yaml）
    #[arg(short, long)]
    properties: Option<PathBuf>,

    /// 环境变量前缀
    #[arg(long, default_value = "DEMO")]
    env_prefix: String,

    /// 模拟请求数量
    #[arg(short, long, default_value_t = 3)]
    requests: usize,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 服务设置，从属性 `app.*` 读取
#[derive(Debug, Clone)]
struct AppSettings {
    name: String,
    verbose: bool,
}

trait Log: Send + Sync {
    fn log(&self, message: &str);
}

#[derive(Debug)]
struct TracingLogger {
    app: String,
    lines: AtomicU64,
}

impl Log for TracingLogger {
    fn log(&self, message: &str) {
        let line = self.lines.fetch_add(1, Ordering::Relaxed);
        info!(app = %self.app, line, "{}", message);
    }
}

struct RequestHandler {
    id: u64,
    logger: Arc<dyn Log>,
    verbose: bool,
}

impl RequestHandler {
    fn handle(&self, path: &str) {
        if self.verbose {
            self.logger.log(&format!("request #{} -> {}", self.id, path));
        }
    }
}

/// 应用模块：根作用域放共享组件，`request` 作用域放每次请求的处理器
struct AppModule {
    request_ids: Arc<AtomicU64>,
}

impl Module for AppModule {
    fn declarations(&self) -> Declaration {
        let request_ids = self.request_ids.clone();
        Declaration::root()
            .define(BeanDefinition::singleton(|resolver| {
                let verbose = match resolver.property_as::<bool>("app.verbose") {
                    Err(DependencyError::PropertyNotFound { .. }) => false,
                    other => other?,
                };
                Ok(AppSettings {
                    name: resolver.property_as("app.name")?,
                    verbose,
                })
            }))
            .define(
                BeanDefinition::singleton(|resolver| {
                    let settings = resolver.get::<AppSettings>()?;
                    Ok(TracingLogger {
                        app: settings.name.clone(),
                        lines: AtomicU64::new(0),
                    })
                })
                .bind(|logger: Arc<TracingLogger>| logger as Arc<dyn Log>),
            )
            .sub_scope(
                Declaration::scope("request").define(BeanDefinition::factory(move |resolver| {
                    Ok(RequestHandler {
                        id: request_ids.fetch_add(1, Ordering::SeqCst),
                        logger: resolver.get::<dyn Log>()?,
                        verbose: resolver.get::<AppSettings>()?.verbose,
                    })
                })),
            )
    }
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&LoggingConfig::default().with_level(parse_log_level(&args.log_level)))
        .map_err(|e| anyhow::anyhow!("日志初始化失败: {e}"))?;

    info!("启动 Lorn DI 示例应用");

    let mut container = Container::new().properties([
        ("app.name", serde_json::json!("example-app")),
        ("app.verbose", serde_json::json!(true)),
    ]);
    if let Some(path) = &args.properties {
        container = container
            .properties_from_file(path)
            .with_context(|| format!("加载属性文件失败: {}", path.display()))?;
    }
    let container = container.properties_from_env(&args.env_prefix)?;

    let context = container.build_with(AppModule {
        request_ids: Arc::new(AtomicU64::new(1)),
    })?;

    for scope in context.scopes() {
        info!(scope = %scope.name, parent = ?scope.parent, "作用域");
    }

    for index in 0..args.requests {
        let handler = context.get_in::<RequestHandler>("request")?;
        handler.handle(&format!("/items/{index}"));
    }

    let stats = context.stats();
    info!(
        scopes = stats.scopes,
        definitions = stats.definitions,
        singletons = stats.cached_singletons,
        "示例运行结束"
    );
    Ok(())
}
