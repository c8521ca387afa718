//! Validation of classifier output into a typed [`AnalysisResult`].
//!
//! The classifier is an untrusted generator. Malformed items are dropped one by one; only a
//! payload missing its load-bearing fields is rejected as a whole.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::analysis::{
    AnalysisItem, AnalysisResult, DestinationSystem, ItemType, PrimaryCategory,
};
use crate::models::config::AnalysisConfig;

const CATEGORIES: [PrimaryCategory; 4] = [
    PrimaryCategory::Meals,
    PrimaryCategory::Workouts,
    PrimaryCategory::Routines,
    PrimaryCategory::Calendar,
];

/// Rebuilds a schema-valid result from raw classifier JSON.
#[derive(Debug, Clone, Default)]
pub struct AnalysisValidator {
    config: AnalysisConfig,
}

impl AnalysisValidator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Validate a payload. `None` means the classifier produced nothing usable.
    pub fn validate(&self, raw: &Value) -> Option<AnalysisResult> {
        let obj = raw.as_object()?;

        let Some(document_title) = obj.get("documentTitle").and_then(Value::as_str) else {
            debug!("Rejecting analysis: documentTitle is not a string");
            return None;
        };
        let Some(summary) = obj.get("summary").and_then(Value::as_str) else {
            debug!("Rejecting analysis: summary is not a string");
            return None;
        };
        let Some(confidence) = obj.get("confidence").and_then(Value::as_f64) else {
            debug!("Rejecting analysis: confidence is not numeric");
            return None;
        };
        let Some(raw_items) = obj.get("items").and_then(Value::as_array) else {
            debug!("Rejecting analysis: items is not a list");
            return None;
        };

        let items: Vec<AnalysisItem> = raw_items
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let item = self.item(raw);
                if item.is_none() {
                    debug!("Dropping malformed analysis item at index {}", index);
                }
                item
            })
            .collect();

        let primary_category = self.primary_category(&items);

        Some(AnalysisResult {
            document_title: document_title.to_string(),
            summary: summary.to_string(),
            confidence: clamp_confidence(confidence),
            items,
            primary_category,
            clarifying_questions: clarifying_questions(obj.get("clarifyingQuestions")),
        })
    }

    fn item(&self, raw: &Value) -> Option<AnalysisItem> {
        let obj = raw.as_object()?;

        let id = match obj.get("id")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let item_type = obj
            .get("itemType")
            .and_then(Value::as_str)
            .and_then(ItemType::parse)?;
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())?;

        let destination_system = obj
            .get("destinationSystem")
            .and_then(Value::as_str)
            .and_then(DestinationSystem::parse)
            .unwrap_or_else(|| item_type.default_destination());

        Some(AnalysisItem {
            id,
            item_type,
            title: title.to_string(),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            details: obj
                .get("details")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_else(Map::new),
            destination_system,
            confidence: obj
                .get("confidence")
                .and_then(Value::as_f64)
                .map(clamp_confidence)
                .unwrap_or(self.config.default_item_confidence),
            is_selected: obj.get("isSelected").and_then(Value::as_bool) != Some(false),
        })
    }

    /// The category holding at least the majority share of items, else `Mixed`.
    pub fn primary_category(&self, items: &[AnalysisItem]) -> PrimaryCategory {
        if items.is_empty() {
            return PrimaryCategory::Mixed;
        }

        let total = items.len() as f64;
        CATEGORIES
            .into_iter()
            .find(|category| {
                let count = items
                    .iter()
                    .filter(|item| item.category() == Some(*category))
                    .count();
                count as f64 / total >= self.config.majority_threshold
            })
            .unwrap_or(PrimaryCategory::Mixed)
    }
}

/// Validate with the default thresholds.
pub fn validate_analysis(raw: &Value) -> Option<AnalysisResult> {
    AnalysisValidator::default().validate(raw)
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn clarifying_questions(raw: Option<&Value>) -> Option<Vec<String>> {
    let questions: Vec<String> = raw?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    (!questions.is_empty()).then_some(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(items: Value) -> Value {
        json!({
            "documentTitle": "Weekly plan",
            "summary": "Meals and workouts for the week",
            "confidence": 82,
            "items": items,
        })
    }

    fn typed(n: usize, item_type: &str) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "id": format!("{}-{}", item_type, i), "itemType": item_type, "title": "x" }))
            .collect()
    }

    #[test]
    fn test_partial_salvage_drops_only_malformed_item() {
        let result = validate_analysis(&payload(json!([
            { "id": "1", "itemType": "meal", "title": "Oatmeal" },
            { "itemType": "meal", "title": "No id" },
            { "id": "3", "itemType": "workout", "title": "Leg day" },
        ])))
        .unwrap();

        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_majority_category() {
        let mut items = typed(4, "meal");
        items.extend(typed(2, "workout"));
        let result = validate_analysis(&payload(Value::Array(items))).unwrap();
        assert_eq!(result.primary_category, PrimaryCategory::Meals);
    }

    #[test]
    fn test_even_split_is_mixed() {
        let mut items = typed(3, "meal");
        items.extend(typed(3, "workout"));
        let result = validate_analysis(&payload(Value::Array(items))).unwrap();
        assert_eq!(result.primary_category, PrimaryCategory::Mixed);
    }

    #[test]
    fn test_category_claim_in_payload_is_ignored() {
        let mut raw = payload(Value::Array(typed(2, "routine")));
        raw["primaryCategory"] = json!("meals");
        let result = validate_analysis(&raw).unwrap();
        assert_eq!(result.primary_category, PrimaryCategory::Routines);
    }

    #[test]
    fn test_plan_items_count_through_destination() {
        let result = validate_analysis(&payload(json!([
            { "id": "a", "itemType": "plan", "title": "Cut sugar", "destinationSystem": "meals" },
            { "id": "b", "itemType": "meal", "title": "Salad" },
            { "id": "c", "itemType": "plan", "title": "Run 5k" },
        ])))
        .unwrap();
        // Two of three count toward meals; the third plan goes to goals and counts for nothing.
        assert_eq!(result.primary_category, PrimaryCategory::Meals);
        assert_eq!(result.items[2].destination_system, DestinationSystem::Goals);
    }

    #[test]
    fn test_item_defaults() {
        let result = validate_analysis(&payload(json!([
            { "id": 7, "itemType": "Workout", "title": " Push-ups ", "confidence": "high" },
        ])))
        .unwrap();

        let item = &result.items[0];
        assert_eq!(item.id, "7");
        assert_eq!(item.item_type, ItemType::Workout);
        assert_eq!(item.title, "Push-ups");
        assert_eq!(item.description, "");
        assert!(item.details.is_empty());
        assert_eq!(item.destination_system, DestinationSystem::Workouts);
        assert_eq!(item.confidence, 50.0);
        assert!(item.is_selected);
    }

    #[test]
    fn test_item_fields_kept() {
        let result = validate_analysis(&payload(json!([
            {
                "id": "m1",
                "itemType": "meal",
                "title": "Overnight oats",
                "description": "Prep the night before",
                "details": { "calories": 420, "mealType": "breakfast" },
                "destinationSystem": "meals",
                "confidence": 140,
                "isSelected": false
            },
        ])))
        .unwrap();

        let item = &result.items[0];
        assert_eq!(item.description, "Prep the night before");
        assert_eq!(item.details["calories"], json!(420));
        assert_eq!(item.confidence, 100.0);
        assert!(!item.is_selected);
    }

    #[test]
    fn test_unknown_item_type_dropped() {
        let result = validate_analysis(&payload(json!([
            { "id": "1", "itemType": "recipe", "title": "Soup" },
            { "id": "2", "itemType": "meal", "title": "" },
            "not an object",
        ])))
        .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.primary_category, PrimaryCategory::Mixed);
    }

    #[test]
    fn test_rejects_missing_load_bearing_fields() {
        assert!(validate_analysis(&json!([])).is_none());
        assert!(validate_analysis(&payload(json!({ "0": {} }))).is_none());

        let mut raw = payload(json!([]));
        raw["confidence"] = json!("82");
        assert!(validate_analysis(&raw).is_none());

        let mut raw = payload(json!([]));
        raw.as_object_mut().unwrap().remove("summary");
        assert!(validate_analysis(&raw).is_none());
    }

    #[test]
    fn test_clarifying_questions() {
        let mut raw = payload(json!([]));
        raw["clarifyingQuestions"] = json!(["Which days are rest days?", 3, ""]);
        let result = validate_analysis(&raw).unwrap();
        assert_eq!(
            result.clarifying_questions,
            Some(vec!["Which days are rest days?".to_string()])
        );

        raw["clarifyingQuestions"] = json!([null]);
        assert_eq!(validate_analysis(&raw).unwrap().clarifying_questions, None);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let validator = AnalysisValidator::new(AnalysisConfig {
            majority_threshold: 0.5,
            ..AnalysisConfig::default()
        });
        let mut items = typed(3, "meal");
        items.extend(typed(3, "workout"));
        let result = validator.validate(&payload(Value::Array(items))).unwrap();
        assert_eq!(result.primary_category, PrimaryCategory::Meals);
    }
}
