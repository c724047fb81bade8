//! CLI 日志系统初始化
//!
//! 基于 `tracing-subscriber` 实现分阶段日志控制。日志写到 stderr，
//! stdout 只留给程序输出。

use crate::config::LogConfig;
use nexus_api::Phase;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{
    filter::Targets, fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, Layer,
    Registry,
};

/// 日志输出格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// 彩色格式化（开发使用）
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式（工具集成）
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format '{}'", other)),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 按阶段目标构建过滤器
pub fn targets(log_config: &LogConfig) -> Targets {
    Phase::ALL
        .iter()
        .fold(Targets::new().with_default(log_config.global), |targets, phase| {
            targets.with_target(phase.target(), log_config.level_for(*phase))
        })
        .with_target("nexus::api", log_config.global)
        .with_target("nexus::cli", log_config.global)
}

/// 使用指定格式和日志配置初始化日志系统；指定文件时同时写入文件
pub fn init(log_config: &LogConfig, format: LogFormat, file: Option<&Path>) -> Result<(), String> {
    let filter = targets(log_config);
    let mut layers: Vec<BoxedLayer> = vec![create_format_layer(format, io::stderr, true)
        .with_filter(filter.clone())
        .boxed()];

    if let Some(path) = file {
        let handle = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Cannot open log file '{}': {}", path.display(), e))?;
        layers.push(
            create_format_layer(format, Mutex::new(handle), false)
                .with_filter(filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Cannot install logger: {}", e))
}

/// Create formatter layer based on format
fn create_format_layer<W>(format: LogFormat, make_writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
    }
}
