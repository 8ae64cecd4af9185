// ==========================================
// 平台运营分析引擎 - 记录读取 Repository Trait
// ==========================================
// 职责: 定义四个数据域 + 告警的只读访问接口（不包含实现）
// 红线: 纯读取，无副作用；空结果是合法结果
// ==========================================

use crate::domain::record::{Alert, DomainRecords, ProgressUpdate, Project, Transaction, User};
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::{AlertStatus, RecordDomain, Severity};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 流水线/调度器/监控接口的数据来源
// 实现者: SqliteRecordStore（使用 rusqlite）
//
// 时间窗在存储侧过滤（created_at ∈ [start, end)），
// 属性条件统一经 DataFilters::matches 过滤
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_projects(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<Project>>;

    async fn fetch_users(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<User>>;

    async fn fetch_transactions(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<Transaction>>;

    async fn fetch_progress_updates(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<ProgressUpdate>>;

    /// 查询告警
    ///
    /// # 参数
    /// - status: 告警状态（None = 全部）
    /// - severity: 严重度（None = 全部）
    async fn fetch_alerts(
        &self,
        status: Option<AlertStatus>,
        severity: Option<Severity>,
    ) -> RepositoryResult<Vec<Alert>>;

    /// 按数据域取数
    async fn fetch(
        &self,
        domain: RecordDomain,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<DomainRecords> {
        Ok(match domain {
            RecordDomain::Projects => DomainRecords::Projects(self.fetch_projects(frame, filters).await?),
            RecordDomain::Users => DomainRecords::Users(self.fetch_users(frame, filters).await?),
            RecordDomain::Transactions => {
                DomainRecords::Transactions(self.fetch_transactions(frame, filters).await?)
            }
            RecordDomain::Impact => {
                DomainRecords::Impact(self.fetch_progress_updates(frame, filters).await?)
            }
        })
    }
}
