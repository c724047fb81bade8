//! 内置人格模板
//!
//! 模板是数据：在默认值 0.7 之上覆盖部分特质。

use super::traits::Trait;

pub struct Template {
    pub name: &'static str,
    pub overrides: &'static [(Trait, f64)],
}

pub static TEMPLATES: [Template; 5] = [
    Template {
        name: "analyst",
        overrides: &[
            (Trait::AnalyticalThinking, 0.95),
            (Trait::Thoroughness, 0.9),
            (Trait::ConfidenceThreshold, 0.85),
            (Trait::Humor, 0.3),
            (Trait::Creativity, 0.5),
            (Trait::Verbosity, 0.6),
        ],
    },
    Template {
        name: "creative",
        overrides: &[
            (Trait::Creativity, 0.95),
            (Trait::Curiosity, 0.9),
            (Trait::Openness, 0.9),
            (Trait::Humor, 0.8),
            (Trait::Formality, 0.3),
            (Trait::Organization, 0.5),
        ],
    },
    Template {
        name: "mentor",
        overrides: &[
            (Trait::Empathy, 0.95),
            (Trait::Verbosity, 0.85),
            (Trait::Transparency, 0.9),
            (Trait::Humility, 0.85),
            (Trait::Reflection, 0.85),
            (Trait::Decisiveness, 0.55),
        ],
    },
    Template {
        name: "explorer",
        overrides: &[
            (Trait::Curiosity, 0.95),
            (Trait::RiskTolerance, 0.85),
            (Trait::Adaptability, 0.9),
            (Trait::LearningRate, 0.9),
            (Trait::Formality, 0.4),
        ],
    },
    Template {
        name: "guardian",
        overrides: &[
            (Trait::RiskTolerance, 0.2),
            (Trait::Consistency, 0.95),
            (Trait::Thoroughness, 0.9),
            (Trait::ConfidenceThreshold, 0.9),
            (Trait::Transparency, 0.9),
            (Trait::Humor, 0.4),
        ],
    },
];

/// 按名称查找模板
pub fn find(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name == name)
}

/// 全部模板名
pub fn names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|t| t.name)
}
