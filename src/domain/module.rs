// ==========================================
// 项目进度管理系统 - 项目模块领域模型
// ==========================================
// 对齐: project_modules 表
// 红线: 0 ≤ progress ≤ 100，状态与进度保持一致
// ==========================================

use crate::domain::types::ModuleStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProjectModule - 项目模块（子工作项）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectModule {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub progress: i32, // 叶子进度（权威值）
    pub status: ModuleStatus,
    pub priority: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 新建模块参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewModule {
    pub name: String,
    pub description: Option<String>,
    pub progress: Option<i32>,
    pub status: Option<ModuleStatus>,
    pub priority: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// 模块基本信息更新（可选字段 Some(None) 表示清空）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleUpdate {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub status: Option<ModuleStatus>,
    pub priority: Option<i32>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<NaiveDate>>,
}

/// 模块统计（按进度口径）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStats {
    pub total: usize,
    pub completed: usize,   // progress == 100
    pub in_progress: usize, // 0 < progress < 100
    pub pending: usize,     // progress == 0
}
