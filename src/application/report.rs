use crate::domain::DomainResult;
use crate::storage::{DataRecord, DbPool, JointRepo};

/// Read-only listing of stored data attachments
pub struct DataReport;

impl DataReport {
    /// Records in store order
    pub async fn records(pool: &DbPool) -> DomainResult<Vec<DataRecord>> {
        JointRepo::list_data_messages(pool).await
    }

    /// `unit:<unit> tag:<payload>`
    pub fn format_record(record: &DataRecord) -> String {
        format!(
            "unit:{} tag:{}",
            record.unit,
            record.payload.as_deref().unwrap_or("")
        )
    }

    pub async fn lines(pool: &DbPool) -> DomainResult<Vec<String>> {
        Ok(Self::records(pool)
            .await?
            .iter()
            .map(Self::format_record)
            .collect())
    }
}
