// ==========================================
// 项目进度管理系统 - 项目领域模型
// ==========================================
// 对齐: projects 表
// 红线: progress 是缓存列，展示进度一律由 ProgressCalculator 实时计算
// ==========================================

use crate::domain::member::MemberInput;
use crate::domain::types::{ProjectSource, ProjectStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    // ===== 主键 =====
    pub id: i64,

    // ===== 基本信息 =====
    pub name: String,
    pub description: Option<String>,
    pub partner: Option<String>, // 合作方（仅横向项目）
    pub amount: Option<f64>,     // 项目金额

    // ===== 生命周期 =====
    pub status: ProjectStatus,
    pub project_source: ProjectSource,

    // ===== 进度 =====
    pub progress: i32,                // 缓存进度（由模块汇总写入）
    pub manual_progress: Option<i32>, // 手动进度（仅横向前期阶段有效）

    // ===== 日期 =====
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>, // 实施完成进入验收的日期

    // ===== 并发控制 =====
    pub revision: i32, // 乐观锁版本号

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Project {
    /// 进度是否仅由状态决定（纵向项目）
    pub fn is_status_driven(&self) -> bool {
        self.project_source.uses_vertical_statuses()
    }
}

// ==========================================
// NewProject - 新建项目参数
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub project_source: Option<ProjectSource>, // None 时取配置默认值
    pub partner: Option<String>,
    pub amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub members: Vec<MemberInput>, // 项目成员（可为空）
}

// ==========================================
// ProjectInfoUpdate - 项目基本信息更新
// ==========================================
// 不含状态与进度：两者各有专用入口
// 可选字段: None 保持原值，Some(None) 清空
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfoUpdate {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub partner: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Option<f64>>,
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

impl ProjectInfoUpdate {
    /// 合并到项目实体
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(partner) = &self.partner {
            project.partner = partner.clone();
        }
        if let Some(amount) = self.amount {
            project.amount = amount;
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            project.end_date = end_date;
        }
    }
}

// ==========================================
// ProjectFilter - 项目列表过滤条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub project_source: Option<ProjectSource>,
    pub search: Option<String>, // 名称/描述模糊匹配
}
