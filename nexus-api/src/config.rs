//! API 层配置
//!
//! 包含执行配置 RunConfig 和全局单例（供 `quick_run` 使用）

use nexus_config::{CompilerConfig, ExecutionMode, LimitConfig};
use nexus_core::{PersonalityError, PersonalityProfile};
use once_cell::sync::OnceCell;

/// Execution configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Interpret the AST or run it through compile → load → VM
    pub mode: ExecutionMode,
    /// Compiler configuration
    pub compiler: CompilerConfig,
    /// Execution limits
    pub limits: LimitConfig,
    /// Starting personality; `personality` blocks in the program apply on top
    pub profile: PersonalityProfile,
    /// Run the static analyzer first and refuse to execute on errors
    pub analyze_before_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            compiler: CompilerConfig::default(),
            limits: LimitConfig::default(),
            profile: PersonalityProfile::default(),
            analyze_before_run: false,
        }
    }
}

impl RunConfig {
    /// 以内置模板作为初始人格
    pub fn with_template(mut self, name: &str) -> Result<Self, PersonalityError> {
        self.profile = PersonalityProfile::from_template(name)?;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }
}

// Global config singleton for CLI convenience
static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Initialize global configuration; gives the config back if one is already set
pub fn init(config: RunConfig) -> Result<(), RunConfig> {
    GLOBAL_CONFIG.set(config)
}

/// Get global config reference, falling back to the defaults
pub fn config() -> &'static RunConfig {
    GLOBAL_CONFIG.get_or_init(RunConfig::default)
}

/// Check if config is initialized
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}
