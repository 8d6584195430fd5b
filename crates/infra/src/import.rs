//! Bulk component import.
//!
//! Each row is created independently: a row that fails domain validation
//! (or clashes on part number) is reported and the rest proceed. Storage
//! failures abort the whole import, since they say nothing about the data.

use serde::Serialize;
use tracing::{info, instrument};

use labstock_core::ComponentId;
use labstock_registry::ComponentDraft;

use crate::error::ServiceError;
use crate::registry::RegistryService;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ImportRowOutcome {
    Created {
        row: usize,
        id: ComponentId,
        part_number: String,
    },
    Failed {
        row: usize,
        part_number: String,
        error: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub failed: usize,
    pub rows: Vec<ImportRowOutcome>,
}

impl RegistryService {
    /// Create many components in one call, reporting per-row outcomes.
    #[instrument(skip(self, drafts), fields(rows = drafts.len()), err)]
    pub async fn import(&self, drafts: Vec<ComponentDraft>) -> Result<ImportReport, ServiceError> {
        let mut report = ImportReport::default();

        for (row, draft) in drafts.into_iter().enumerate() {
            let part_number = draft.part_number.trim().to_string();
            match self.create(draft).await {
                Ok(component) => {
                    report.created += 1;
                    report.rows.push(ImportRowOutcome::Created {
                        row,
                        id: component.id,
                        part_number: component.part_number,
                    });
                }
                Err(ServiceError::Domain(e)) => {
                    report.failed += 1;
                    report.rows.push(ImportRowOutcome::Failed {
                        row,
                        part_number,
                        error: e.to_string(),
                    });
                }
                Err(other) => return Err(other),
            }
        }

        info!(created = report.created, failed = report.failed, "import finished");
        Ok(report)
    }
}
