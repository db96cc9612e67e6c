//! # Wellbeing Questionnaire
//!
//! Scores four lifestyle answers into a risk category with a fixed
//! recommendation, logs the category, and periodically drops old logs.

use chrono::{DateTime, Duration, Utc};
use folio_core::{Error, Record, Result, Value};
use serde::Serialize;
use serde_json::Value as Json;

use crate::store::MemoryStore;

pub const LOG_COLLECTION: &str = "questionnaire_logs";

/// Answers after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Answers {
    pub sleep_hours: f64,
    pub stress_level: f64,
    pub exercise_frequency: f64,
    pub diet_quality: f64,
}

/// (field, min, max) for every answer, in the order they are checked.
const RANGES: [(&str, f64, f64); 4] = [
    ("sleep_hours", 0.0, 24.0),
    ("stress_level", 0.0, 10.0),
    ("exercise_frequency", 0.0, 14.0),
    ("diet_quality", 0.0, 5.0),
];

impl Answers {
    /// Every field must be a JSON number inside its range.
    pub fn from_json(body: &Json) -> Result<Self> {
        let mut values = [0.0; 4];
        for (slot, (field, min, max)) in values.iter_mut().zip(RANGES) {
            let n = body
                .get(field)
                .and_then(Json::as_f64)
                .ok_or_else(|| Error::invalid(format!("Invalid {field}: must be a number")))?;
            if !(min..=max).contains(&n) {
                return Err(Error::invalid(format!(
                    "Invalid {field}: must be between {min} and {max}"
                )));
            }
            *slot = n;
        }
        let [sleep_hours, stress_level, exercise_frequency, diet_quality] = values;
        Ok(Self {
            sleep_hours,
            stress_level,
            exercise_frequency,
            diet_quality,
        })
    }

    /// Higher is worse. Sleep above 8 hours and exercise above 7 sessions
    /// earn no extra credit.
    pub fn score(&self) -> f64 {
        (8.0 - self.sleep_hours.min(8.0)) * 1.2 + self.stress_level * 1.5
            - self.exercise_frequency.min(7.0) * 0.8
            - self.diet_quality * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl Category {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 2.0 => Category::VeryLow,
            s if s < 4.0 => Category::Low,
            s if s < 6.0 => Category::Moderate,
            s if s < 8.0 => Category::High,
            _ => Category::VeryHigh,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::VeryLow => "Very Low",
            Category::Low => "Low",
            Category::Moderate => "Moderate",
            Category::High => "High",
            Category::VeryHigh => "Very High",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Category::VeryLow => "keep up the great habits!",
            Category::Low => "Ensure 7-8 hours of sleep, maintain balanced diet and regular exercise",
            Category::Moderate => "Everyday walk 30 mins, limit screen time before bed",
            Category::High => "Schedule weekly relaxation time, avoid caffeine late",
            Category::VeryHigh => {
                "Suggest consulting a healthcare professional for personalized advice"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub category: Category,
    pub recommendations: Vec<String>,
}

impl From<Category> for Assessment {
    fn from(category: Category) -> Self {
        Self {
            category,
            recommendations: vec![category.recommendation().to_string()],
        }
    }
}

/// Validate and score `body`, then log the resulting category.
pub async fn submit(store: &MemoryStore, body: &Json) -> Result<Assessment> {
    let answers = Answers::from_json(body)?;
    let category = Category::from_score(answers.score());

    let entry = Record::default()
        .with("ts", Utc::now())
        .with("category", category.label());
    store.insert(LOG_COLLECTION, entry).await;

    tracing::info!("Questionnaire scored {:.2} ({})", answers.score(), category.label());
    Ok(category.into())
}

// =============================================================================
// Retention
// =============================================================================

/// Delete log entries whose `ts` is older than `now - retention`. Entries
/// without a readable timestamp are kept. Returns the number removed.
pub async fn sweep_expired(store: &MemoryStore, retention: Duration, now: DateTime<Utc>) -> usize {
    let cutoff = now - retention;
    store
        .retain(LOG_COLLECTION, |record| {
            logged_at(record).map_or(true, |ts| ts >= cutoff)
        })
        .await
}

/// `ts` as a timestamp, or as RFC 3339 text for entries loaded from JSON.
fn logged_at(record: &Record) -> Option<DateTime<Utc>> {
    match record.get("ts")? {
        Value::Timestamp(ts) => Some(*ts),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    }
}

/// Background task: sweep expired questionnaire logs every `interval`.
pub async fn retention_sweeper(store: std::sync::Arc<MemoryStore>, retention_days: i64, interval: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
    let retention = Duration::days(retention_days);

    loop {
        ticker.tick().await;
        let removed = sweep_expired(&store, retention, Utc::now()).await;
        if removed > 0 {
            tracing::info!("Deleted {} questionnaire logs older than {} days", removed, retention_days);
        } else {
            tracing::debug!("Retention sweep found nothing to delete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::RecordSource;
    use serde_json::json;

    fn answers(sleep: f64, stress: f64, exercise: f64, diet: f64) -> Json {
        json!({
            "sleep_hours": sleep,
            "stress_level": stress,
            "exercise_frequency": exercise,
            "diet_quality": diet,
        })
    }

    #[test]
    fn test_score_caps_sleep_and_exercise() {
        let a = Answers::from_json(&answers(10.0, 0.0, 14.0, 5.0)).unwrap();
        assert!((a.score() - (-8.1)).abs() < 1e-9);

        let b = Answers::from_json(&answers(4.0, 8.0, 1.0, 1.0)).unwrap();
        // 4*1.2 + 8*1.5 - 0.8 - 0.5
        assert!((b.score() - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Category::from_score(-3.0), Category::VeryLow);
        assert_eq!(Category::from_score(1.99), Category::VeryLow);
        assert_eq!(Category::from_score(2.0), Category::Low);
        assert_eq!(Category::from_score(4.0), Category::Moderate);
        assert_eq!(Category::from_score(6.0), Category::High);
        assert_eq!(Category::from_score(8.0), Category::VeryHigh);
    }

    #[test]
    fn test_validation_rejects_out_of_range_and_non_numbers() {
        let err = Answers::from_json(&answers(25.0, 1.0, 1.0, 1.0)).unwrap_err();
        assert_eq!(err, Error::invalid("Invalid sleep_hours: must be between 0 and 24"));

        let mut body = answers(7.0, 1.0, 1.0, 1.0);
        body["diet_quality"] = json!("3");
        let err = Answers::from_json(&body).unwrap_err();
        assert_eq!(err, Error::invalid("Invalid diet_quality: must be a number"));

        assert!(Answers::from_json(&json!({})).is_err());
    }

    #[test]
    fn test_assessment_serialization() {
        let json = serde_json::to_value(Assessment::from(Category::VeryHigh)).unwrap();
        assert_eq!(json["category"], "Very High");
        assert_eq!(
            json["recommendations"],
            serde_json::json!(["Suggest consulting a healthcare professional for personalized advice"])
        );
    }

    #[tokio::test]
    async fn test_submit_logs_category() {
        let store = MemoryStore::new();
        let assessment = submit(&store, &answers(8.0, 0.0, 3.0, 4.0)).await.unwrap();
        assert_eq!(assessment.category, Category::VeryLow);

        let logs = store.fetch_all(LOG_COLLECTION).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].get("category"), Some(&Value::from("Very Low")));
        assert!(logs[0].get("ts").and_then(Value::as_timestamp).is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_entries() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert(LOG_COLLECTION, Record::new("old").with("ts", now - Duration::days(31)))
            .await;
        store
            .insert(LOG_COLLECTION, Record::new("fresh").with("ts", now - Duration::days(2)))
            .await;
        store
            .insert(
                LOG_COLLECTION,
                Record::new("imported").with("ts", "2000-01-01T00:00:00Z"),
            )
            .await;
        store.insert(LOG_COLLECTION, Record::new("undated")).await;

        let removed = sweep_expired(&store, Duration::days(30), now).await;
        assert_eq!(removed, 2);

        let ids: Vec<String> = store
            .fetch_all(LOG_COLLECTION)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["fresh", "undated"]);
    }
}
