//! 人格档案
//!
//! 档案是不可变快照：每个操作都返回新档案，从不原地修改。
//! 越界值在边界处被拒绝，不会被静默截断。

use super::error::PersonalityError;
use super::template;
use super::traits::{Trait, TRAIT_COUNT};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// 新档案中每个特质的初始值
pub const DEFAULT_TRAIT_VALUE: f64 = 0.7;

/// 权重之和允许的误差
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// 演化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// 从 +1 / -1 转换
    pub fn from_sign(sign: i8) -> Option<Direction> {
        match sign {
            1 => Some(Direction::Increase),
            -1 => Some(Direction::Decrease),
            _ => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}

/// 特质的定性描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Moderate,
    Low,
}

impl Level {
    /// >0.8 high，>0.6 moderate，其余 low
    pub fn of(value: f64) -> Level {
        if value > 0.8 {
            Level::High
        } else if value > 0.6 {
            Level::Moderate
        } else {
            Level::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Moderate => "moderate",
            Level::Low => "low",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 24 个特质的有序取值
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct PersonalityProfile {
    values: [f64; TRAIT_COUNT],
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            values: [DEFAULT_TRAIT_VALUE; TRAIT_COUNT],
        }
    }
}

fn validate(t: Trait, value: f64) -> Result<f64, PersonalityError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PersonalityError::out_of_range(t.name(), value))
    }
}

impl PersonalityProfile {
    /// 由内置模板创建
    pub fn from_template(name: &str) -> Result<Self, PersonalityError> {
        let template = template::find(name)
            .ok_or_else(|| PersonalityError::UnknownTemplate(name.to_string()))?;
        let mut values = [DEFAULT_TRAIT_VALUE; TRAIT_COUNT];
        for (t, value) in template.overrides {
            values[t.index()] = *value;
        }
        Ok(Self { values })
    }

    pub fn get(&self, t: Trait) -> f64 {
        self.values[t.index()]
    }

    pub fn set(&self, t: Trait, value: f64) -> Result<Self, PersonalityError> {
        let mut next = *self;
        next.values[t.index()] = validate(t, value)?;
        Ok(next)
    }

    /// 按名称设置，名称未知时报 `InvalidTrait`
    pub fn set_named(&self, name: &str, value: f64) -> Result<Self, PersonalityError> {
        let t = Trait::from_name(name).ok_or_else(|| PersonalityError::unknown_trait(name))?;
        self.set(t, value)
    }

    /// new = clamp(old ± rate, 0, 1)
    pub fn evolve(
        &self,
        t: Trait,
        direction: Direction,
        rate: f64,
    ) -> Result<Self, PersonalityError> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(PersonalityError::InvalidEvolution(rate));
        }
        let mut next = *self;
        next.values[t.index()] = (self.get(t) + direction.sign() * rate).clamp(0.0, 1.0);
        Ok(next)
    }

    /// 逐特质加权混合：wa * self + wb * other
    pub fn mix(
        &self,
        other: &PersonalityProfile,
        weights: (f64, f64),
    ) -> Result<Self, PersonalityError> {
        let (wa, wb) = weights;
        let in_unit = |w: f64| w.is_finite() && (0.0..=1.0).contains(&w);
        if !in_unit(wa) || !in_unit(wb) || (wa + wb - 1.0).abs() > WEIGHT_EPSILON {
            return Err(PersonalityError::InvalidWeights(wa, wb));
        }

        let mut values = [0.0; TRAIT_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            // 权重和在误差内为 1，结果可能超出边界一个舍入量
            *value = (wa * self.values[i] + wb * other.values[i]).clamp(0.0, 1.0);
        }
        Ok(Self { values })
    }

    pub fn describe(&self, t: Trait) -> Level {
        Level::of(self.get(t))
    }

    /// 应用一个 personality 块；块内重复的特质与越界值都会被拒绝
    pub fn apply_block(&self, entries: &[(Trait, f64)]) -> Result<Self, PersonalityError> {
        let mut seen = [false; TRAIT_COUNT];
        let mut next = *self;
        for (t, value) in entries {
            if std::mem::replace(&mut seen[t.index()], true) {
                return Err(PersonalityError::DuplicateTrait(t.name().to_string()));
            }
            next = next.set(*t, *value)?;
        }
        Ok(next)
    }

    /// 按特质序号遍历
    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::all().map(move |t| (t, self.get(t)))
    }
}

impl TryFrom<BTreeMap<String, f64>> for PersonalityProfile {
    type Error = PersonalityError;

    /// 缺省的特质保持默认值
    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        map.iter()
            .try_fold(PersonalityProfile::default(), |profile, (name, value)| {
                profile.set_named(name, *value)
            })
    }
}

impl Serialize for PersonalityProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(TRAIT_COUNT))?;
        for (t, value) in self.iter() {
            map.serialize_entry(t.name(), &value)?;
        }
        map.end()
    }
}
