// ==========================================
// 平台运营分析引擎 - 分析快照仓储
// ==========================================
// 用途: 历史对比的只读数据源
// 红线: 只写一次（first writer wins），不提供更新接口
// ==========================================

use crate::domain::snapshot::{snapshot_key, AnalyticsSnapshot};
use crate::domain::types::{Granularity, RecordDomain};
use crate::repository::document_repo::{
    collections, DocumentQuery, DocumentStore, InsertOutcome, NewDocument,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

pub struct SnapshotRepository {
    store: Arc<dyn DocumentStore>,
}

impl SnapshotRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 写入快照（已存在同键快照时不做任何修改）
    pub async fn insert_once(&self, snapshot: &AnalyticsSnapshot) -> RepositoryResult<InsertOutcome> {
        let doc = NewDocument {
            natural_key: snapshot.natural_key(),
            body: serde_json::to_value(snapshot)?,
            expires_at: Some(snapshot.expires_at),
        };
        self.store.insert(collections::SNAPSHOTS, doc).await
    }

    /// 按 (周期起点, 粒度, 数据域) 读取
    pub async fn find(
        &self,
        period_start: DateTime<Utc>,
        granularity: Granularity,
        domain: RecordDomain,
    ) -> RepositoryResult<Option<AnalyticsSnapshot>> {
        let key = snapshot_key(period_start, granularity, domain);
        match self.store.get(collections::SNAPSHOTS, &key).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc.body)?)),
            None => Ok(None),
        }
    }

    /// 读取周期起点落在某日的全部快照（含当日各小时周期）
    pub async fn list_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<AnalyticsSnapshot>> {
        let prefix = date.format("%Y-%m-%d").to_string();
        let docs = self
            .store
            .query(collections::SNAPSHOTS, DocumentQuery::default().with_key_prefix(&prefix))
            .await?;
        docs.into_iter()
            .map(|d| serde_json::from_value(d.body).map_err(RepositoryError::from))
            .collect()
    }

    /// 读取全部快照（按日期升序）
    pub async fn list_all(&self) -> RepositoryResult<Vec<AnalyticsSnapshot>> {
        let docs = self
            .store
            .query(collections::SNAPSHOTS, DocumentQuery::default())
            .await?;
        docs.into_iter()
            .map(|d| serde_json::from_value(d.body).map_err(RepositoryError::from))
            .collect()
    }

    /// 清理过期快照
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.store.purge_expired(collections::SNAPSHOTS, now).await
    }
}
