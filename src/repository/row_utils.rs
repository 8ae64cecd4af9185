// ==========================================
// 平台运营分析引擎 - 行映射工具
// ==========================================
// 职责: TEXT 列到枚举/时间戳/JSON 的统一转换
// ==========================================

use crate::db::parse_ts;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use std::str::FromStr;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// 读取枚举列（存储为 snake_case 文本）
pub fn enum_col<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

/// 读取时间戳列
pub fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| conversion_error(idx, format!("时间戳格式错误 {}: {}", raw, e)))
}

/// 读取可空时间戳列
pub fn opt_ts_col(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => parse_ts(&s)
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("时间戳格式错误 {}: {}", s, e))),
        _ => Ok(None),
    }
}

/// 读取 JSON 列
pub fn json_col<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}
