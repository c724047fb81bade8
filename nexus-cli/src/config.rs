//! CLI 配置
//!
//! `nexus.json` 的结构、日志配置，以及二者到 `RunConfig` 的转换。
//! 命令行参数在此之后覆盖文件中的值。

use nexus_api::{CompilerConfig, ExecutionMode, LimitConfig, Phase, RunConfig};
use nexus_core::PersonalityProfile;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// 未指定 `--config` 时查找的文件
pub const DEFAULT_CONFIG_FILE: &str = "nexus.json";

/// nexus.json 结构
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mode: ExecutionMode,
    pub analyze_before_run: bool,
    pub compiler: CompilerConfig,
    pub limits: LimitConfig,
    pub personality: PersonalitySection,
    pub log: LogSection,
    /// 静态知识库（JSON 数组）路径，相对于配置文件
    pub knowledge: Option<PathBuf>,
}

/// 初始人格：先取模板，再逐个覆盖特质
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersonalitySection {
    pub template: Option<String>,
    pub traits: BTreeMap<String, f64>,
}

/// 日志段
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// "off", "error", "warn", "info", "debug", "trace"
    pub level: Option<String>,
    /// "pretty", "compact", "json"
    pub format: Option<String>,
    pub file: Option<PathBuf>,
    /// 按阶段覆盖级别，键为 lexer、parser、analyzer、compiler、loader、vm
    pub phases: BTreeMap<String, String>,
}

impl FileConfig {
    /// 读取配置；`explicit` 为 false 时文件不存在视为空配置
    pub fn load(path: &Path, explicit: bool) -> Result<Self, String> {
        if !path.exists() {
            if explicit {
                return Err(format!("Config file '{}' not found", path.display()));
            }
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
        let mut config: FileConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?;

        if let (Some(knowledge), Some(dir)) = (&config.knowledge, path.parent()) {
            config.knowledge = Some(dir.join(knowledge));
        }
        Ok(config)
    }

    /// 文件中的人格段转换为档案
    pub fn profile(&self) -> Result<PersonalityProfile, String> {
        let base = match &self.personality.template {
            Some(name) => PersonalityProfile::from_template(name).map_err(|e| e.to_string())?,
            None => PersonalityProfile::default(),
        };
        self.personality
            .traits
            .iter()
            .try_fold(base, |profile, (name, value)| profile.set_named(name, *value))
            .map_err(|e| e.to_string())
    }

    pub fn run_config(&self) -> Result<RunConfig, String> {
        Ok(RunConfig {
            mode: self.mode,
            compiler: self.compiler.clone(),
            limits: self.limits.clone(),
            profile: self.profile()?,
            analyze_before_run: self.analyze_before_run,
        })
    }
}

/// CLI 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: LevelFilter,
    pub phases: BTreeMap<&'static str, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: LevelFilter::WARN,
            phases: BTreeMap::new(),
        }
    }
}

pub fn parse_level(s: &str) -> Result<LevelFilter, String> {
    match s.to_lowercase().as_str() {
        "silent" => Ok(LevelFilter::OFF),
        other => other
            .parse::<LevelFilter>()
            .map_err(|_| format!("Unknown log level '{}'", s)),
    }
}

impl LogConfig {
    pub fn from_section(section: &LogSection) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(level) = &section.level {
            config.global = parse_level(level)?;
        }
        for (name, level) in &section.phases {
            let phase = Phase::ALL
                .iter()
                .find(|p| p.as_str() == name)
                .ok_or_else(|| format!("Unknown log phase '{}'", name))?;
            config.phases.insert(phase.as_str(), parse_level(level)?);
        }
        Ok(config)
    }

    /// Get log level for a specific phase
    pub fn level_for(&self, phase: Phase) -> LevelFilter {
        self.phases
            .get(phase.as_str())
            .copied()
            .unwrap_or(self.global)
    }
}
