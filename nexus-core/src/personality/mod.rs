//! 人格模型
//!
//! 一组有界的数值特质，以及校验、混合与演化的纯函数。
//! 档案作为值随每次运行传递，不存在进程级的全局人格状态。

pub mod error;
pub mod profile;
pub mod template;
pub mod traits;

pub use error::PersonalityError;
pub use profile::{Direction, Level, PersonalityProfile, DEFAULT_TRAIT_VALUE};
pub use traits::{Category, Trait, TRAIT_COUNT};
