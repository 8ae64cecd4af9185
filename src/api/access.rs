// ==========================================
// 平台运营分析引擎 - 访问控制
// ==========================================
// 职责: 令牌 → 身份 → 角色 → 授权判定
// 红线: 角色只通过 RoleLookup::role_of 查询，不存在第二条角色来源
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::Role;
use crate::repository::{Identity, IdentityProvider, RoleLookup};
use std::sync::Arc;

/// 生成报告/洞察所需的角色
pub const ANALYST_ROLES: &[Role] = &[Role::Admin, Role::Verifier];

/// 已授权的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub role: Role,
}

pub struct AccessGuard {
    identity: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleLookup>,
}

impl AccessGuard {
    pub fn new(identity: Arc<dyn IdentityProvider>, roles: Arc<dyn RoleLookup>) -> Self {
        Self { identity, roles }
    }

    /// 认证：识别令牌并查询角色
    pub async fn authenticate(&self, token: &str) -> ApiResult<Caller> {
        let identity = self
            .identity
            .identify(token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        let role = self
            .roles
            .role_of(&identity.user_id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        Ok(Caller { identity, role })
    }

    /// 认证并要求角色属于 allowed
    pub async fn authorize(&self, token: &str, allowed: &[Role]) -> ApiResult<Caller> {
        let caller = self.authenticate(token).await?;
        if !allowed.contains(&caller.role) {
            tracing::warn!(
                user_id = %caller.identity.user_id,
                role = %caller.role,
                "角色无权执行该操作"
            );
            return Err(ApiError::NotAuthorized(format!(
                "角色 {} 无权执行该操作",
                caller.role
            )));
        }
        Ok(caller)
    }
}
