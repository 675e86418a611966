//! 角色颜色规则：正向谓词 + 否决谓词

use serde::{Deserialize, Serialize};

use crate::core::color::{ColorName, RegionStats};

/// Minimum `min/max` balance between two colors to count as bands rather than a blob.
pub const MIN_STRIPE_RATIO: f32 = 0.4;

/// A color test over one region, with its parameters baked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    /// Two colors alternating in bands, each within a ratio window.
    Stripes {
        primary: ColorName,
        primary_ratio: (f32, f32),
        secondary: ColorName,
        secondary_ratio: (f32, f32),
    },
    /// Both colors strictly above a floor.
    Pair {
        first: ColorName,
        first_min: f32,
        second: ColorName,
        second_min: f32,
    },
    /// One color strictly above a ceiling.
    Excess { color: ColorName, max_ratio: f32 },
}

impl Predicate {
    pub fn evaluate(&self, stats: &RegionStats) -> bool {
        match *self {
            Predicate::Stripes {
                primary,
                primary_ratio,
                secondary,
                secondary_ratio,
            } => {
                let p = stats.ratio(primary);
                let s = stats.ratio(secondary);
                p >= primary_ratio.0
                    && p <= primary_ratio.1
                    && s >= secondary_ratio.0
                    && s <= secondary_ratio.1
                    && stripe_ratio(stats.count(primary), stats.count(secondary)) > MIN_STRIPE_RATIO
            }
            Predicate::Pair {
                first,
                first_min,
                second,
                second_min,
            } => stats.ratio(first) > first_min && stats.ratio(second) > second_min,
            Predicate::Excess { color, max_ratio } => stats.ratio(color) > max_ratio,
        }
    }
}

/// `min(a, b) / max(a, b, 1)`; 0 when both counts are 0.
pub fn stripe_ratio(a: u32, b: u32) -> f32 {
    a.min(b) as f32 / a.max(b).max(1) as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositiveRule {
    RedWhiteStripes,
    YellowBlackStripes,
    RedWhiteBeard,
    RedWhiteSpot,
}

impl PositiveRule {
    pub fn predicate(self) -> Predicate {
        match self {
            PositiveRule::RedWhiteStripes => Predicate::Stripes {
                primary: ColorName::Red,
                primary_ratio: (0.25, 0.6),
                secondary: ColorName::White,
                secondary_ratio: (0.15, 0.5),
            },
            PositiveRule::YellowBlackStripes => Predicate::Stripes {
                primary: ColorName::Yellow,
                primary_ratio: (0.25, 0.6),
                secondary: ColorName::Black,
                secondary_ratio: (0.15, 0.5),
            },
            PositiveRule::RedWhiteBeard => Predicate::Pair {
                first: ColorName::Red,
                first_min: 0.2,
                second: ColorName::White,
                second_min: 0.25,
            },
            PositiveRule::RedWhiteSpot => Predicate::Pair {
                first: ColorName::Red,
                first_min: 0.15,
                second: ColorName::White,
                second_min: 0.15,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeRule {
    Orange,
    Magenta,
    YellowBrown,
}

impl NegativeRule {
    pub fn predicate(self) -> Predicate {
        match self {
            NegativeRule::Orange => Predicate::Excess {
                color: ColorName::Orange,
                max_ratio: 0.2,
            },
            NegativeRule::Magenta => Predicate::Excess {
                color: ColorName::Magenta,
                max_ratio: 0.2,
            },
            NegativeRule::YellowBrown => Predicate::Excess {
                color: ColorName::YellowBrown,
                max_ratio: 0.25,
            },
        }
    }
}

/// Per-character rule. No positive predicate means anything passes it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorRule {
    #[serde(default)]
    pub positive: Option<PositiveRule>,
    #[serde(default)]
    pub negative: Vec<NegativeRule>,
}

impl ColorRule {
    pub fn new(positive: PositiveRule, negative: Vec<NegativeRule>) -> Self {
        Self {
            positive: Some(positive),
            negative,
        }
    }

    /// Positive holds and no negative vetoes.
    pub fn accepts(&self, stats: &RegionStats) -> bool {
        let positive_ok = self
            .positive
            .map(|rule| rule.predicate().evaluate(stats))
            .unwrap_or(true);
        if !positive_ok {
            return false;
        }
        !self
            .negative
            .iter()
            .any(|rule| rule.predicate().evaluate(stats))
    }
}
