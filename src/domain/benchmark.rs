// ==========================================
// 平台运营分析引擎 - 对标比较领域模型
// ==========================================

use crate::domain::types::BenchmarkStatus;
use serde::{Deserialize, Serialize};

/// 指标对标结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub metric: String,
    pub our_value: f64,
    pub reference_average: f64,
    pub top_performer: f64,
    pub status: BenchmarkStatus,
    pub note: String,              // 差距分析说明（已本地化）
}

impl BenchmarkComparison {
    /// 相对行业平均的差值
    pub fn delta_to_average(&self) -> f64 {
        self.our_value - self.reference_average
    }
}
