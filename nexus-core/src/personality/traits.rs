//! 人格特质枚举与查找表
//!
//! 24 个固定特质，分属 6 个类别。源码与二进制格式都通过本表
//! 在名称、序号与枚举之间转换。

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 特质类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cognitive,
    Social,
    Decision,
    WorkStyle,
    Learning,
    Meta,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cognitive => "cognitive",
            Category::Social => "social",
            Category::Decision => "decision",
            Category::WorkStyle => "work_style",
            Category::Learning => "learning",
            Category::Meta => "meta",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 人格特质
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Trait {
    // cognitive
    Curiosity = 0,
    Creativity,
    AnalyticalThinking,
    AbstractReasoning,
    // social
    Empathy,
    Humor,
    Formality,
    Verbosity,
    // decision
    Decisiveness,
    RiskTolerance,
    ConfidenceThreshold,
    Intuition,
    // work style
    Thoroughness,
    Efficiency,
    Persistence,
    Organization,
    // learning
    Adaptability,
    LearningRate,
    Openness,
    Reflection,
    // meta
    SelfAwareness,
    Transparency,
    Consistency,
    Humility,
}

/// 特质总数
pub const TRAIT_COUNT: usize = 24;

/// (名称, 特质, 类别)，顺序与枚举序号一致
pub static TRAIT_TABLE: [(&str, Trait, Category); TRAIT_COUNT] = [
    ("curiosity", Trait::Curiosity, Category::Cognitive),
    ("creativity", Trait::Creativity, Category::Cognitive),
    ("analytical_thinking", Trait::AnalyticalThinking, Category::Cognitive),
    ("abstract_reasoning", Trait::AbstractReasoning, Category::Cognitive),
    ("empathy", Trait::Empathy, Category::Social),
    ("humor", Trait::Humor, Category::Social),
    ("formality", Trait::Formality, Category::Social),
    ("verbosity", Trait::Verbosity, Category::Social),
    ("decisiveness", Trait::Decisiveness, Category::Decision),
    ("risk_tolerance", Trait::RiskTolerance, Category::Decision),
    ("confidence_threshold", Trait::ConfidenceThreshold, Category::Decision),
    ("intuition", Trait::Intuition, Category::Decision),
    ("thoroughness", Trait::Thoroughness, Category::WorkStyle),
    ("efficiency", Trait::Efficiency, Category::WorkStyle),
    ("persistence", Trait::Persistence, Category::WorkStyle),
    ("organization", Trait::Organization, Category::WorkStyle),
    ("adaptability", Trait::Adaptability, Category::Learning),
    ("learning_rate", Trait::LearningRate, Category::Learning),
    ("openness", Trait::Openness, Category::Learning),
    ("reflection", Trait::Reflection, Category::Learning),
    ("self_awareness", Trait::SelfAwareness, Category::Meta),
    ("transparency", Trait::Transparency, Category::Meta),
    ("consistency", Trait::Consistency, Category::Meta),
    ("humility", Trait::Humility, Category::Meta),
];

static BY_NAME: Lazy<HashMap<&'static str, Trait>> = Lazy::new(|| {
    TRAIT_TABLE
        .iter()
        .map(|(name, t, _)| (*name, *t))
        .collect()
});

impl Trait {
    /// 按序号排列的全部特质
    pub fn all() -> impl Iterator<Item = Trait> {
        TRAIT_TABLE.iter().map(|(_, t, _)| *t)
    }

    pub fn from_name(name: &str) -> Option<Trait> {
        BY_NAME.get(name).copied()
    }

    /// 从二进制格式中的序号还原
    pub fn from_index(index: u8) -> Option<Trait> {
        TRAIT_TABLE.get(index as usize).map(|(_, t, _)| *t)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        TRAIT_TABLE[self.index()].0
    }

    pub fn category(self) -> Category {
        TRAIT_TABLE[self.index()].2
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        for (i, (_, t, _)) in TRAIT_TABLE.iter().enumerate() {
            assert_eq!(t.index(), i);
            assert_eq!(Trait::from_index(i as u8), Some(*t));
        }
        assert_eq!(Trait::from_index(TRAIT_COUNT as u8), None);
    }

    #[test]
    fn test_name_round_trip() {
        for t in Trait::all() {
            assert_eq!(Trait::from_name(t.name()), Some(t));
        }
        assert_eq!(Trait::from_name("charisma"), None);
    }

    #[test]
    fn test_six_categories_of_four() {
        for category in [
            Category::Cognitive,
            Category::Social,
            Category::Decision,
            Category::WorkStyle,
            Category::Learning,
            Category::Meta,
        ] {
            assert_eq!(Trait::all().filter(|t| t.category() == category).count(), 4);
        }
    }

    #[test]
    fn test_known_names() {
        assert_eq!(Trait::Curiosity.to_string(), "curiosity");
        assert_eq!(
            Trait::from_name("confidence_threshold"),
            Some(Trait::ConfidenceThreshold)
        );
        assert_eq!(Trait::Verbosity.category(), Category::Social);
    }
}
