// ==========================================
// 平台运营分析引擎 - CSV 记录导入器
// ==========================================
// 职责: 从 CSV 目录加载五类运营记录写入 SQLite 记录存储
// 文件: projects.csv / milestones.csv / users.csv / transactions.csv /
//       progress_updates.csv / alerts.csv（缺失的文件跳过）
// ==========================================
// 红线: 单个文件任一行校验失败时整个文件不写入
// ==========================================

use crate::domain::record::{Alert, Milestone, ProgressUpdate, Project, Transaction, User};
use crate::domain::types::{MilestoneStatus, ProjectStatus};
use crate::i18n;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::SqliteRecordStore;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

// ==========================================
// 导入文件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFile {
    Projects,
    Milestones,
    Users,
    Transactions,
    ProgressUpdates,
    Alerts,
}

impl RecordFile {
    pub fn file_name(&self) -> &'static str {
        match self {
            RecordFile::Projects => "projects.csv",
            RecordFile::Milestones => "milestones.csv",
            RecordFile::Users => "users.csv",
            RecordFile::Transactions => "transactions.csv",
            RecordFile::ProgressUpdates => "progress_updates.csv",
            RecordFile::Alerts => "alerts.csv",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecordFile::Projects => "projects",
            RecordFile::Milestones => "milestones",
            RecordFile::Users => "users",
            RecordFile::Transactions => "transactions",
            RecordFile::ProgressUpdates => "progress_updates",
            RecordFile::Alerts => "alerts",
        }
    }
}

/// 导入结果汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// kind -> 写入条数
    pub imported: BTreeMap<String, usize>,
    pub skipped_files: Vec<String>,
    /// 本地化的导入消息
    pub messages: Vec<String>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported.values().sum()
    }
}

// ==========================================
// CSV 行结构
// ==========================================
// 项目行不含里程碑，里程碑在 milestones.csv 中按 project_id 关联
#[derive(Debug, Deserialize)]
struct ProjectRow {
    id: String,
    name: String,
    owner_id: String,
    project_type: String,
    region: String,
    status: ProjectStatus,
    progress_pct: f64,
    funding_goal: f64,
    funding_raised: f64,
    credits_issued: f64,
    estimated_completion: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_update_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MilestoneRow {
    project_id: String,
    name: String,
    planned_date: DateTime<Utc>,
    status: MilestoneStatus,
}

// ==========================================
// RecordImporter
// ==========================================
pub struct RecordImporter {
    store: Arc<SqliteRecordStore>,
    locale: String,
}

impl RecordImporter {
    pub fn new(store: Arc<SqliteRecordStore>, locale: &str) -> Self {
        Self {
            store,
            locale: locale.to_string(),
        }
    }

    /// 导入目录下的全部记录文件
    pub fn import_dir(&self, dir: &Path) -> ImportResult<ImportSummary> {
        if !dir.is_dir() {
            return Err(ImportError::FileNotFound(dir.display().to_string()));
        }

        let mut summary = ImportSummary::default();
        let present = |file: RecordFile| dir.join(file.file_name()).exists();

        if present(RecordFile::Projects) {
            let milestones = if present(RecordFile::Milestones) {
                Some(dir.join(RecordFile::Milestones.file_name()))
            } else {
                summary.skipped_files.push(RecordFile::Milestones.file_name().to_string());
                None
            };
            let count = self.import_projects(
                &dir.join(RecordFile::Projects.file_name()),
                milestones.as_deref(),
            )?;
            self.record(&mut summary, RecordFile::Projects, count);
        } else {
            summary.skipped_files.push(RecordFile::Projects.file_name().to_string());
            if present(RecordFile::Milestones) {
                tracing::warn!("存在 milestones.csv 但缺少 projects.csv，里程碑未导入");
            }
        }

        for file in [
            RecordFile::Users,
            RecordFile::Transactions,
            RecordFile::ProgressUpdates,
            RecordFile::Alerts,
        ] {
            if !present(file) {
                tracing::debug!(file = file.file_name(), "导入文件不存在，跳过");
                summary.skipped_files.push(file.file_name().to_string());
                continue;
            }
            let count = self.import_file(file, &dir.join(file.file_name()))?;
            self.record(&mut summary, file, count);
        }

        tracing::info!(
            dir = %dir.display(),
            total = summary.total(),
            skipped = summary.skipped_files.len(),
            "记录导入完成"
        );
        Ok(summary)
    }

    /// 导入单个非项目文件
    pub fn import_file(&self, file: RecordFile, path: &Path) -> ImportResult<usize> {
        let name = file.file_name();
        let count = match file {
            RecordFile::Users => {
                let rows: Vec<(usize, User)> = read_rows(path)?;
                for (row, user) in &rows {
                    require_id(name, *row, &user.id)?;
                }
                self.store.insert_users(&strip(rows))?
            }
            RecordFile::Transactions => {
                let rows: Vec<(usize, Transaction)> = read_rows(path)?;
                for (row, txn) in &rows {
                    require_id(name, *row, &txn.id)?;
                }
                self.store.insert_transactions(&strip(rows))?
            }
            RecordFile::ProgressUpdates => {
                let rows: Vec<(usize, ProgressUpdate)> = read_rows(path)?;
                for (row, update) in &rows {
                    require_id(name, *row, &update.id)?;
                    require_range(name, *row, "progress_pct", update.progress_pct, 0.0, 100.0)?;
                }
                self.store.insert_progress_updates(&strip(rows))?
            }
            RecordFile::Alerts => {
                let rows: Vec<(usize, Alert)> = read_rows(path)?;
                for (row, alert) in &rows {
                    require_id(name, *row, &alert.id)?;
                }
                self.store.insert_alerts(&strip(rows))?
            }
            RecordFile::Projects | RecordFile::Milestones => {
                return Err(ImportError::InternalError(format!(
                    "{} 需通过 import_projects 导入",
                    name
                )))
            }
        };
        Ok(count)
    }

    /// 导入项目（附带里程碑）
    pub fn import_projects(&self, projects: &Path, milestones: Option<&Path>) -> ImportResult<usize> {
        let file = RecordFile::Projects.file_name();
        let rows: Vec<(usize, ProjectRow)> = read_rows(projects)?;

        let mut by_id: HashMap<String, Project> = HashMap::with_capacity(rows.len());
        let mut order: Vec<String> = Vec::with_capacity(rows.len());
        for (row, p) in rows {
            require_id(file, row, &p.id)?;
            require_range(file, row, "progress_pct", p.progress_pct, 0.0, 100.0)?;
            order.push(p.id.clone());
            by_id.insert(
                p.id.clone(),
                Project {
                    id: p.id,
                    name: p.name,
                    owner_id: p.owner_id,
                    project_type: p.project_type,
                    region: p.region,
                    status: p.status,
                    progress_pct: p.progress_pct,
                    funding_goal: p.funding_goal,
                    funding_raised: p.funding_raised,
                    credits_issued: p.credits_issued,
                    estimated_completion: p.estimated_completion,
                    milestones: Vec::new(),
                    created_at: p.created_at,
                    last_update_at: p.last_update_at,
                },
            );
        }

        if let Some(path) = milestones {
            let file = RecordFile::Milestones.file_name();
            let rows: Vec<(usize, MilestoneRow)> = read_rows(path)?;
            for (row, m) in rows {
                let project = by_id.get_mut(&m.project_id).ok_or_else(|| ImportError::UnknownProject {
                    file: file.to_string(),
                    row,
                    project_id: m.project_id.clone(),
                })?;
                project.milestones.push(Milestone {
                    name: m.name,
                    planned_date: m.planned_date,
                    status: m.status,
                });
            }
        }

        let projects: Vec<Project> = order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|mut p| {
                p.milestones.sort_by_key(|m| m.planned_date);
                p
            })
            .collect();
        Ok(self.store.insert_projects(&projects)?)
    }

    fn record(&self, summary: &mut ImportSummary, file: RecordFile, count: usize) {
        let count_text = count.to_string();
        summary.messages.push(i18n::t_in(
            &self.locale,
            "import.completed",
            &[("count", &count_text), ("kind", file.kind())],
        ));
        summary.imported.insert(file.kind().to_string(), count);
        tracing::debug!(kind = file.kind(), count = count, "文件导入完成");
    }
}

// ==========================================
// CSV 读取与校验
// ==========================================

/// 读取 CSV 行（行号从 2 开始，第 1 行为表头）
fn read_rows<T: DeserializeOwned>(path: &Path) -> ImportResult<Vec<(usize, T)>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    if let Some(ext) = path.extension() {
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
        }
    }

    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?;

    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(idx, result)| {
            result
                .map(|record| (idx + 2, record))
                .map_err(|e| ImportError::RowParseError {
                    file: file_name.clone(),
                    row: idx + 2,
                    message: e.to_string(),
                })
        })
        .collect()
}

fn strip<T>(rows: Vec<(usize, T)>) -> Vec<T> {
    rows.into_iter().map(|(_, r)| r).collect()
}

fn require_id(file: &str, row: usize, id: &str) -> ImportResult<()> {
    if id.trim().is_empty() {
        return Err(ImportError::PrimaryKeyMissing {
            file: file.to_string(),
            row,
        });
    }
    Ok(())
}

fn require_range(file: &str, row: usize, field: &str, value: f64, min: f64, max: f64) -> ImportResult<()> {
    if !(min..=max).contains(&value) {
        return Err(ImportError::ValueRangeError {
            file: file.to_string(),
            row,
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_frame::{DataFilters, TimeFrame};
    use crate::domain::types::Granularity;
    use crate::repository::RecordStore;
    use chrono::TimeZone;
    use rusqlite::Connection;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn create_test_importer() -> (RecordImporter, Arc<SqliteRecordStore>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let store = Arc::new(SqliteRecordStore::from_connection(Arc::new(Mutex::new(conn))));
        (RecordImporter::new(store.clone(), "en"), store)
    }

    fn all_time() -> TimeFrame {
        TimeFrame::new(
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap(),
            Granularity::Yearly,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_import_projects_with_milestones() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("projects.csv"),
            "id,name,owner_id,project_type,region,status,progress_pct,funding_goal,funding_raised,credits_issued,estimated_completion,created_at,last_update_at\n\
             P1,Mangrove,U1,reforestation,asia,active,40,50000,20000,0,,2024-01-05T00:00:00Z,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("milestones.csv"),
            "project_id,name,planned_date,status\n\
             P1,planting,2024-06-01T00:00:00Z,pending\n\
             P1,survey,2024-02-01T00:00:00Z,completed\n",
        )
        .unwrap();

        let (importer, store) = create_test_importer();
        let summary = importer.import_dir(dir.path()).unwrap();
        assert_eq!(summary.imported["projects"], 1);
        assert_eq!(summary.messages[0], "Imported 1 projects records");
        assert!(summary.skipped_files.contains(&"users.csv".to_string()));

        let projects = store
            .fetch_projects(&all_time(), &DataFilters::default())
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].milestones.len(), 2);
        assert_eq!(projects[0].milestones[0].name, "survey");
        assert!(projects[0].estimated_completion.is_none());
    }

    #[tokio::test]
    async fn test_import_transactions_and_alerts() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("transactions.csv"),
            "id,user_id,project_id,kind,status,payment_method,amount,credits,created_at\n\
             T1,U1,P1,purchase,completed,card,120.5,3,2024-03-01T10:00:00Z\n\
             T2,U2,,refund,completed,card,-20,0,2024-03-02T10:00:00Z\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("alerts.csv"),
            "id,component,severity,status,message,created_at\n\
             A1,payments,high,active,gateway slow,2024-03-02T11:00:00Z\n",
        )
        .unwrap();

        let (importer, store) = create_test_importer();
        let summary = importer.import_dir(dir.path()).unwrap();
        assert_eq!(summary.total(), 3);

        let txns = store
            .fetch_transactions(&all_time(), &DataFilters::default())
            .await
            .unwrap();
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().any(|t| t.project_id.is_none()));
        assert_eq!(store.fetch_alerts(None, None).await.unwrap().len(), 1);
    }

    #[test]
    fn test_bad_row_reports_line_number() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("users.csv"),
            "id,role,status,region,created_at,last_active_at,purchase_count,projects_created\n\
             U1,buyer,active,eu,2024-01-01T00:00:00Z,,1,0\n\
             U2,wizard,active,eu,2024-01-01T00:00:00Z,,1,0\n",
        )
        .unwrap();

        let (importer, _) = create_test_importer();
        let err = importer.import_dir(dir.path()).unwrap_err();
        match err {
            ImportError::RowParseError { file, row, .. } => {
                assert_eq!(file, "users.csv");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_progress_out_of_range_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("progress_updates.csv"),
            "id,project_id,update_type,status,progress_pct,carbon_impact,created_at\n\
             R1,P1,monthly,verified,140,2.5,2024-01-01T00:00:00Z\n",
        )
        .unwrap();

        let (importer, _) = create_test_importer();
        let err = importer.import_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::ValueRangeError { row: 2, .. }));
    }

    #[test]
    fn test_missing_dir_is_error() {
        let (importer, _) = create_test_importer();
        let err = importer
            .import_dir(Path::new("/nonexistent/impact-analytics-import"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
