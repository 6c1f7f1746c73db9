// ==========================================
// 项目进度管理系统 - 进度历史记录
// ==========================================
// 对齐: progress_records / module_progress_records 表
// 用途: 审计追踪，每次人工进度写入都留痕
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 项目进度记录（直接更新项目进度时写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub record_id: String,
    pub project_id: i64,
    pub progress: i32,
    pub notes: Option<String>,
    pub updated_by: String,
    pub updated_at: NaiveDateTime,
}

/// 模块进度记录（更新模块进度时写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleProgressRecord {
    pub record_id: String,
    pub module_id: i64,
    pub progress: i32,
    pub notes: Option<String>,
    pub updated_by: String,
    pub updated_at: NaiveDateTime,
}

impl ProgressRecord {
    pub fn new(project_id: i64, progress: i32, notes: Option<String>, updated_by: &str) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            project_id,
            progress,
            notes,
            updated_by: updated_by.to_string(),
            updated_at: chrono::Local::now().naive_local(),
        }
    }
}

impl ModuleProgressRecord {
    pub fn new(module_id: i64, progress: i32, notes: Option<String>, updated_by: &str) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            module_id,
            progress,
            notes,
            updated_by: updated_by.to_string(),
            updated_at: chrono::Local::now().naive_local(),
        }
    }
}
