// ==========================================
// 平台运营分析引擎 - 报告仓储
// ==========================================
// 红线: 报告追加写入，永不覆盖；按 ID 读取要么得到完整文档，要么 None
// ==========================================

use crate::domain::report::Report;
use crate::repository::document_repo::{collections, DocumentStore, InsertOutcome, NewDocument};
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub struct ReportRepository {
    store: Arc<dyn DocumentStore>,
}

impl ReportRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 插入报告
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 同 ID 报告已存在（不会被覆盖）
    pub async fn insert(&self, report: &Report) -> RepositoryResult<String> {
        let doc = NewDocument {
            natural_key: report.id.clone(),
            body: serde_json::to_value(report)?,
            expires_at: None,
        };
        match self.store.insert(collections::REPORTS, doc).await? {
            InsertOutcome::Inserted(_) => Ok(report.id.clone()),
            InsertOutcome::AlreadyExists => Err(RepositoryError::UniqueConstraintViolation(
                format!("report_id={} 已存在", report.id),
            )),
        }
    }

    pub async fn find_by_id(&self, report_id: &str) -> RepositoryResult<Option<Report>> {
        match self.store.get(collections::REPORTS, report_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc.body)?)),
            None => Ok(None),
        }
    }
}
