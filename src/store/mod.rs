//! SQLite-backed feature store.
//!
//! Features persist across restarts; estimation sessions do not. The store
//! is the engine's only external collaborator: sessions read a feature's
//! name for display, and commit writes snapped consensus values back
//! through the [`EstimateSink`] seam.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use crate::engine::{EstimateSink, SinkError};
use crate::models::{CreateFeatureInput, EstimationField, Feature};

const FEATURE_COLUMNS: &str = "id, name, description, acceptance_criteria, business_value, \
     time_complexity, oe_rr_value, job_size, story_points, created_at, updated_at";

#[derive(Clone)]
pub struct FeatureStore {
    conn: Arc<Mutex<Connection>>,
}

impl FeatureStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Store path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "scrumdeck")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("scrumdeck.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Insert the sample SAFe backlog when the store holds no features at
    /// all. A non-empty store is left untouched. Returns whether seeding
    /// happened.
    pub fn seed_if_empty(&self) -> Result<bool> {
        {
            let conn = self.conn.lock().expect("store lock poisoned");
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(false);
            }
        }

        for input in sample_features() {
            self.create_feature(input)?;
        }
        tracing::info!("Seeded feature store with sample backlog");
        Ok(true)
    }

    pub fn get_all_features(&self) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEATURE_COLUMNS} FROM features ORDER BY id"
        ))?;

        let features = stmt
            .query_map([], row_to_feature)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_feature(&self, id: &str) -> Result<Option<Feature>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEATURE_COLUMNS} FROM features WHERE id = ?"
        ))?;

        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_feature(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_feature(&self, input: CreateFeatureInput) -> Result<Feature> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO features (id, name, description, acceptance_criteria, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &input.id,
                &input.name,
                &input.description,
                &input.acceptance_criteria,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Feature {
            id: input.id,
            name: input.name,
            description: input.description,
            acceptance_criteria: input.acceptance_criteria,
            business_value: None,
            time_complexity: None,
            oe_rr_value: None,
            job_size: None,
            story_points: None,
            created_at: now,
            updated_at: now,
        })
    }
}

impl EstimateSink for FeatureStore {
    /// Write one committed estimate into its feature column.
    ///
    /// A busy or locked database maps to [`SinkError::Conflict`] so the
    /// caller can report a retryable conflict instead of a server error.
    /// An unknown feature id is a no-op, matching the tolerant write-back
    /// of the original spreadsheet store.
    fn write_field(
        &self,
        feature_id: &str,
        field: EstimationField,
        value: i64,
    ) -> Result<(), SinkError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let now = Utc::now().to_rfc3339();

        // Column names come from a closed enum, never from input.
        let sql = format!(
            "UPDATE features SET {} = ?, updated_at = ? WHERE id = ?",
            field.column()
        );
        conn.execute(&sql, (value, &now, feature_id))
            .map_err(classify_write_error)?;
        Ok(())
    }
}

fn classify_write_error(e: rusqlite::Error) -> SinkError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            SinkError::Conflict
        }
        _ => SinkError::Other(anyhow::Error::from(e)),
    }
}

fn row_to_feature(row: &rusqlite::Row) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        acceptance_criteria: row.get(3)?,
        business_value: row.get(4)?,
        time_complexity: row.get(5)?,
        oe_rr_value: row.get(6)?,
        job_size: row.get(7)?,
        story_points: row.get(8)?,
        created_at: parse_datetime(row.get::<_, String>(9)?),
        updated_at: parse_datetime(row.get::<_, String>(10)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// The sample SAFe backlog used to bootstrap an empty store.
fn sample_features() -> Vec<CreateFeatureInput> {
    vec![
        CreateFeatureInput {
            id: "FTR-PI-001".to_string(),
            name: "Payments Modernization".to_string(),
            description: Some(
                "As a finance stakeholder, I want modern payment processing so that \
                 regulatory and customer expectations are met."
                    .to_string(),
            ),
            acceptance_criteria: Some(
                "• Regulatory compliance met\n• Zero manual reconciliation\n• Peak load validated"
                    .to_string(),
            ),
        },
        CreateFeatureInput {
            id: "FTR-PI-002".to_string(),
            name: "Customer Analytics Platform".to_string(),
            description: Some(
                "As a business owner, I want unified customer analytics so that decisions \
                 are data-driven."
                    .to_string(),
            ),
            acceptance_criteria: Some(
                "• Single source of truth\n• GDPR compliant\n• Business dashboards available"
                    .to_string(),
            ),
        },
        CreateFeatureInput {
            id: "FTR-PI-003".to_string(),
            name: "Legacy System Decommissioning".to_string(),
            description: Some(
                "As an IT leader, I want to retire legacy systems so that risk and cost \
                 are reduced."
                    .to_string(),
            ),
            acceptance_criteria: Some(
                "• No active consumers\n• Data archived\n• Support contracts closed".to_string(),
            ),
        },
        CreateFeatureInput {
            id: "FTR-PI-004".to_string(),
            name: "AI Assisted Support".to_string(),
            description: Some(
                "As a support manager, I want AI assistance so that resolution time improves."
                    .to_string(),
            ),
            acceptance_criteria: Some(
                "• Accuracy threshold met\n• Human override enabled\n• Audit logs available"
                    .to_string(),
            ),
        },
        CreateFeatureInput {
            id: "FTR-PI-005".to_string(),
            name: "Mobile Experience Revamp".to_string(),
            description: Some(
                "As a customer, I want a modern mobile experience so that interactions are \
                 intuitive."
                    .to_string(),
            ),
            acceptance_criteria: Some(
                "• UX council approved\n• Performance benchmarks met\n• Rating improvement tracked"
                    .to_string(),
            ),
        },
    ]
}
