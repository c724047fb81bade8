//! 人格模型错误

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersonalityError {
    /// 未知特质名，或特质值不在 [0, 1] 内
    #[error("invalid trait '{name}': {reason}")]
    InvalidTrait { name: String, reason: String },

    #[error("unknown personality template '{0}'")]
    UnknownTemplate(String),

    #[error("invalid weights ({0}, {1}): each weight must lie in [0, 1] and they must sum to 1")]
    InvalidWeights(f64, f64),

    #[error("invalid evolution rate {0}: rate must lie in (0, 1]")]
    InvalidEvolution(f64),

    #[error("duplicate trait '{0}' in personality block")]
    DuplicateTrait(String),
}

impl PersonalityError {
    pub(crate) fn unknown_trait(name: &str) -> Self {
        PersonalityError::InvalidTrait {
            name: name.to_string(),
            reason: "unknown trait".to_string(),
        }
    }

    pub(crate) fn out_of_range(name: &str, value: f64) -> Self {
        PersonalityError::InvalidTrait {
            name: name.to_string(),
            reason: format!("value {} is outside [0.0, 1.0]", value),
        }
    }
}
