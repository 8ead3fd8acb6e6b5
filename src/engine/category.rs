//! Transaction categories: a fixed income set and a fixed outcome set,
//! mutually exclusive. The chosen category is fixed at creation time and
//! stored as a discriminated tag (`income:salary`, `outcome:food`); it is
//! never re-derived from the amount sign afterwards.

use serde::{Deserialize, Serialize};

use super::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    Salary,
    Bonus,
    Invest,
    Other,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 4] = [Self::Salary, Self::Bonus, Self::Invest, Self::Other];

    /// Wire encoding addresses categories by index; anything out of range
    /// falls back to `Other` rather than failing.
    pub fn from_index(idx: u32) -> Self {
        Self::ALL.get(idx as usize).copied().unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Bonus => "bonus",
            Self::Invest => "invest",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Food,
    Rent,
    Transport,
    Entertain,
    Other,
}

impl OutcomeCategory {
    pub const ALL: [OutcomeCategory; 5] = [
        Self::Food,
        Self::Rent,
        Self::Transport,
        Self::Entertain,
        Self::Other,
    ];

    pub fn from_index(idx: u32) -> Self {
        Self::ALL.get(idx as usize).copied().unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Rent => "rent",
            Self::Transport => "transport",
            Self::Entertain => "entertain",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "category")]
pub enum Category {
    Income(IncomeCategory),
    Outcome(OutcomeCategory),
}

impl Category {
    /// The discriminated tag persisted in the `category` column.
    pub fn tag(&self) -> String {
        match self {
            Self::Income(c) => format!("income:{}", c.as_str()),
            Self::Outcome(c) => format!("outcome:{}", c.as_str()),
        }
    }

    /// Decode a stored tag. The set is decided by the prefix alone; an
    /// unknown variant within a known set reads as that set's `other`.
    pub fn parse_tag(tag: &str) -> Result<Self, CoreError> {
        let (kind, variant) = tag
            .split_once(':')
            .ok_or_else(|| CoreError::MalformedCategory(tag.to_string()))?;
        match kind {
            "income" => Ok(Self::Income(match variant {
                "salary" => IncomeCategory::Salary,
                "bonus" => IncomeCategory::Bonus,
                "invest" => IncomeCategory::Invest,
                _ => IncomeCategory::Other,
            })),
            "outcome" => Ok(Self::Outcome(match variant {
                "food" => OutcomeCategory::Food,
                "rent" => OutcomeCategory::Rent,
                "transport" => OutcomeCategory::Transport,
                "entertain" => OutcomeCategory::Entertain,
                _ => OutcomeCategory::Other,
            })),
            _ => Err(CoreError::MalformedCategory(tag.to_string())),
        }
    }

    /// The sign invariant: income pairs with non-negative amounts, outcome
    /// with negative ones.
    pub fn check_amount(&self, amount: f64) -> Result<(), CoreError> {
        match self {
            Self::Income(_) if amount < 0.0 => Err(CoreError::NegativeIncome),
            Self::Outcome(_) if amount >= 0.0 => Err(CoreError::NonNegativeOutcome),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
