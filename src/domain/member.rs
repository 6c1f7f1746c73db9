// ==========================================
// 项目进度管理系统 - 成员领域模型
// ==========================================
// 对齐: project_members / module_assignments 表
// 成员以名称标识（账号体系不在本系统内）
// ==========================================

use crate::domain::types::MemberRole;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 项目成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub member: String,
    pub role: MemberRole,
    pub joined_at: NaiveDateTime,
}

/// 模块分工
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAssignment {
    pub id: i64,
    pub module_id: i64,
    pub member: String,
    pub role: MemberRole,
    pub assigned_at: NaiveDateTime,
}

/// 成员写入参数（角色缺省为普通成员）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInput {
    pub member: String,
    #[serde(default)]
    pub role: Option<MemberRole>,
}

impl MemberInput {
    pub fn new(member: &str, role: MemberRole) -> Self {
        Self {
            member: member.to_string(),
            role: Some(role),
        }
    }

    pub fn role_or_default(&self) -> MemberRole {
        self.role.unwrap_or_default()
    }
}
