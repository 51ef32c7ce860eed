use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::field::EstimationField;

/// A backlog feature awaiting estimation.
///
/// One nullable estimate column exists per [`EstimationField`]; a committed
/// consensus fills the column, and recommitting overwrites it as estimates
/// evolve. Ids are human-readable (e.g. `FTR-PI-001`) rather than UUIDs so
/// they can double as session keys and survive export to spreadsheets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub business_value: Option<i64>,
    pub time_complexity: Option<i64>,
    pub oe_rr_value: Option<i64>,
    pub job_size: Option<i64>,
    pub story_points: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// Read the estimate column for a field.
    pub fn estimate(&self, field: EstimationField) -> Option<i64> {
        match field {
            EstimationField::BusinessValue => self.business_value,
            EstimationField::TimeComplexity => self.time_complexity,
            EstimationField::OeRrValue => self.oe_rr_value,
            EstimationField::JobSize => self.job_size,
            EstimationField::StoryPoints => self.story_points,
        }
    }
}

/// Input for creating a feature in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
}
