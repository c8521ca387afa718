//! Validated document-analysis models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of an extracted line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Meal,
    Workout,
    Routine,
    Calendar,
    Plan,
}

impl ItemType {
    /// Parse a classifier-supplied type name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "meal" => Some(ItemType::Meal),
            "workout" => Some(ItemType::Workout),
            "routine" => Some(ItemType::Routine),
            "calendar" => Some(ItemType::Calendar),
            "plan" => Some(ItemType::Plan),
            _ => None,
        }
    }

    /// Category this type counts toward; plans have none of their own.
    pub fn category(&self) -> Option<PrimaryCategory> {
        match self {
            ItemType::Meal => Some(PrimaryCategory::Meals),
            ItemType::Workout => Some(PrimaryCategory::Workouts),
            ItemType::Routine => Some(PrimaryCategory::Routines),
            ItemType::Calendar => Some(PrimaryCategory::Calendar),
            ItemType::Plan => None,
        }
    }

    /// Where an item of this type is saved when the classifier didn't say.
    pub fn default_destination(&self) -> DestinationSystem {
        match self {
            ItemType::Meal => DestinationSystem::Meals,
            ItemType::Workout => DestinationSystem::Workouts,
            ItemType::Routine => DestinationSystem::Habits,
            ItemType::Calendar => DestinationSystem::Calendar,
            ItemType::Plan => DestinationSystem::Goals,
        }
    }
}

/// System an accepted item is imported into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationSystem {
    Meals,
    Workouts,
    Habits,
    Calendar,
    Goals,
}

impl DestinationSystem {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "meals" | "meal" | "nutrition" => Some(DestinationSystem::Meals),
            "workouts" | "workout" | "fitness" => Some(DestinationSystem::Workouts),
            "habits" | "habit" | "routines" | "routine" => Some(DestinationSystem::Habits),
            "calendar" | "events" => Some(DestinationSystem::Calendar),
            "goals" | "goal" | "plans" => Some(DestinationSystem::Goals),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<PrimaryCategory> {
        match self {
            DestinationSystem::Meals => Some(PrimaryCategory::Meals),
            DestinationSystem::Workouts => Some(PrimaryCategory::Workouts),
            DestinationSystem::Habits => Some(PrimaryCategory::Routines),
            DestinationSystem::Calendar => Some(PrimaryCategory::Calendar),
            DestinationSystem::Goals => None,
        }
    }
}

/// Summarizing label for a whole document, derived from its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryCategory {
    Meals,
    Workouts,
    Routines,
    Calendar,
    Mixed,
}

/// A single validated line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisItem {
    pub id: String,
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    /// Free-form, type-specific fields passed through from the classifier.
    pub details: Map<String, Value>,
    pub destination_system: DestinationSystem,
    /// Per-item confidence, 0-100.
    pub confidence: f64,
    pub is_selected: bool,
}

impl AnalysisItem {
    /// Category this item counts toward: its type first, then its destination.
    pub fn category(&self) -> Option<PrimaryCategory> {
        self.item_type
            .category()
            .or_else(|| self.destination_system.category())
    }
}

/// Validated output of document classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub document_title: String,
    pub summary: String,
    /// Overall confidence, 0-100.
    pub confidence: f64,
    pub items: Vec<AnalysisItem>,
    /// Always computed locally from `items`.
    pub primary_category: PrimaryCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarifying_questions: Option<Vec<String>>,
}

impl AnalysisResult {
    /// Items the user has left selected for import.
    pub fn selected_items(&self) -> impl Iterator<Item = &AnalysisItem> {
        self.items.iter().filter(|item| item.is_selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::parse("Meal"), Some(ItemType::Meal));
        assert_eq!(ItemType::parse(" workout "), Some(ItemType::Workout));
        assert_eq!(ItemType::parse("recipe"), None);
    }

    #[test]
    fn test_plan_category_falls_back_to_destination() {
        let item = AnalysisItem {
            id: "1".to_string(),
            item_type: ItemType::Plan,
            title: "Week plan".to_string(),
            description: String::new(),
            details: Map::new(),
            destination_system: DestinationSystem::Meals,
            confidence: 50.0,
            is_selected: true,
        };
        assert_eq!(item.category(), Some(PrimaryCategory::Meals));

        let goal = AnalysisItem {
            destination_system: DestinationSystem::Goals,
            ..item
        };
        assert_eq!(goal.category(), None);
    }
}
