// ==========================================
// 平台运营分析引擎 - 洞察仓储
// ==========================================

use crate::domain::insight::Insight;
use crate::domain::types::AnalysisType;
use crate::repository::document_repo::{collections, DocumentQuery, DocumentStore, NewDocument};
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub struct InsightRepository {
    store: Arc<dyn DocumentStore>,
}

impl InsightRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 唯一键: "{analysis_type}/{insight_id}"
    fn key_of(insight: &Insight) -> String {
        format!("{}/{}", insight.analysis_type.as_str(), insight.id)
    }

    /// 一次事务写入一批洞察，返回写入数量
    pub async fn insert_batch(&self, insights: &[Insight]) -> RepositoryResult<usize> {
        let docs = insights
            .iter()
            .map(|i| -> RepositoryResult<NewDocument> {
                Ok(NewDocument {
                    natural_key: Self::key_of(i),
                    body: serde_json::to_value(i)?,
                    expires_at: None,
                })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;
        self.store.insert_many(collections::INSIGHTS, docs).await
    }

    pub async fn list_by_type(&self, analysis_type: AnalysisType) -> RepositoryResult<Vec<Insight>> {
        let prefix = format!("{}/", analysis_type.as_str());
        let docs = self
            .store
            .query(collections::INSIGHTS, DocumentQuery::default().with_key_prefix(&prefix))
            .await?;
        docs.into_iter()
            .map(|d| serde_json::from_value(d.body).map_err(RepositoryError::from))
            .collect()
    }
}
