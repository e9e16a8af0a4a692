//! Watched entity categories and the channels subscribers listen on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One watched table.
///
/// Declaration order is the order categories are checked within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Agents,
    Sessions,
    Events,
    LlmUsage,
    ToolExecutions,
    SecurityAlerts,
}

/// How new rows are recognised for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Rows are updated in place; compare `created_at` / `updated_at`
    Timestamp,
    /// Rows are append-only; compare the monotonic `id`
    Identifier,
}

impl EntityCategory {
    /// Every category, in tick order.
    pub const ALL: [EntityCategory; 6] = [
        EntityCategory::Agents,
        EntityCategory::Sessions,
        EntityCategory::Events,
        EntityCategory::LlmUsage,
        EntityCategory::ToolExecutions,
        EntityCategory::SecurityAlerts,
    ];

    /// Underlying table name.
    pub fn table(self) -> &'static str {
        match self {
            EntityCategory::Agents => "agents",
            EntityCategory::Sessions => "sessions",
            EntityCategory::Events => "events",
            EntityCategory::LlmUsage => "llm_usage",
            EntityCategory::ToolExecutions => "tool_executions",
            EntityCategory::SecurityAlerts => "security_alerts",
        }
    }

    pub fn strategy(self) -> DetectionStrategy {
        match self {
            EntityCategory::Agents | EntityCategory::Sessions | EntityCategory::SecurityAlerts => {
                DetectionStrategy::Timestamp
            }
            EntityCategory::Events | EntityCategory::LlmUsage | EntityCategory::ToolExecutions => {
                DetectionStrategy::Identifier
            }
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for EntityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EntityCategory::ALL
            .into_iter()
            .find(|c| c.table() == wanted)
            .ok_or_else(|| format!("Invalid category: {}", s))
    }
}

impl fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStrategy::Timestamp => f.write_str("timestamp"),
            DetectionStrategy::Identifier => f.write_str("identifier"),
        }
    }
}

/// Subscription key: one concrete category, or every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Category(EntityCategory),
    All,
}

impl From<EntityCategory> for Channel {
    fn from(category: EntityCategory) -> Self {
        Channel::Category(category)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Category(c) => c.fmt(f),
            Channel::All => f.write_str("*"),
        }
    }
}
