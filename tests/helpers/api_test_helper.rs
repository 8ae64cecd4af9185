// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 基于临时数据库组装完整 AppState，并预置会话
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use impact_analytics::app::AppState;
use impact_analytics::domain::types::Role;
use tempfile::NamedTempFile;

pub use test_helpers::{at, day, frame};

/// 管理员令牌
pub const ADMIN_TOKEN: &str = "token-admin";
/// 审核员令牌
pub const VERIFIER_TOKEN: &str = "token-verifier";
/// 普通买家令牌（无分析权限）
pub const BUYER_TOKEN: &str = "token-buyer";

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 持有临时数据库文件，环境存活期间数据库有效
pub struct ApiTestEnv {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl ApiTestEnv {
    pub async fn new() -> Self {
        impact_analytics::logging::init_test();
        let (temp_file, db_path) = test_helpers::create_test_db().unwrap();
        let state = AppState::new(db_path.clone()).await.unwrap();

        for (token, user_id, role) in [
            (ADMIN_TOKEN, "SEED_ADMIN", Role::Admin),
            (VERIFIER_TOKEN, "SEED_VERIFIER", Role::Verifier),
            (BUYER_TOKEN, "SEED_BUYER", Role::Buyer),
        ] {
            test_helpers::seed_session(&state.record_store, &state.access_repo, token, user_id, role);
        }

        Self {
            _temp_file: temp_file,
            db_path,
            state,
        }
    }
}
