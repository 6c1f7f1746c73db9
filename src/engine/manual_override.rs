// ==========================================
// 项目进度管理系统 - 手动进度校验
// ==========================================
// 职责: 写入手动进度前的硬校验
// 前置条件: 横向项目 且 状态为前期阶段
// 区间: 当前状态在区间表中的 [min, max]
// 红线: 校验失败必须拒绝写入（与计算引擎的软回退不同）
// ==========================================

use crate::domain::project::Project;
use crate::domain::types::{ProjectSource, ProjectStatus};
use crate::engine::stage_table::{ProgressRange, StageTable};
use thiserror::Error;
use tracing::{debug, instrument};

/// 手动进度错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualProgressError {
    #[error("当前状态不允许手动设置进度: project_source={project_source}, status={status}")]
    InvalidState {
        project_source: ProjectSource,
        status: ProjectStatus,
    },

    #[error("手动进度 {value} 超出当前阶段允许范围 [{lo}, {hi}]")]
    OutOfRange { lo: i32, hi: i32, value: i32 },
}

// ==========================================
// ManualOverrideValidator - 手动进度校验器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualOverrideValidator;

impl ManualOverrideValidator {
    pub fn new() -> Self {
        Self
    }

    /// 当前状态下允许的手动区间
    ///
    /// # 返回
    /// - Ok(range): 横向项目的前期阶段
    /// - Err(InvalidState): 其他来源或非前期阶段
    pub fn allowed_range(
        &self,
        project_source: ProjectSource,
        status: ProjectStatus,
    ) -> Result<ProgressRange, ManualProgressError> {
        let invalid = || ManualProgressError::InvalidState {
            project_source,
            status,
        };

        if project_source != ProjectSource::Horizontal {
            return Err(invalid());
        }

        StageTable::lookup(project_source, status)
            .and_then(|entry| entry.rule.manual_range())
            .ok_or_else(invalid)
    }

    /// 校验手动进度
    #[instrument(skip(self, project), fields(project_id = project.id, status = %project.status))]
    pub fn validate(&self, project: &Project, value: i32) -> Result<i32, ManualProgressError> {
        let range = self.allowed_range(project.project_source, project.status)?;
        if !range.contains(value) {
            return Err(ManualProgressError::OutOfRange {
                lo: range.min,
                hi: range.max,
                value,
            });
        }
        debug!(value, min = range.min, max = range.max, "手动进度校验通过");
        Ok(value)
    }

    /// 校验并写入手动进度（不修改状态）
    pub fn set_manual(&self, project: &mut Project, value: i32) -> Result<(), ManualProgressError> {
        let value = self.validate(project, value)?;
        project.manual_progress = Some(value);
        Ok(())
    }

    /// 检查已存储的手动进度在当前状态下是否失效
    ///
    /// # 返回
    /// - Some(value): 手动值存在但已不适用于当前状态
    /// - None: 无手动值，或仍然有效
    pub fn stale_manual(&self, project: &Project) -> Option<i32> {
        let value = project.manual_progress?;
        match self.allowed_range(project.project_source, project.status) {
            Ok(range) if range.contains(value) => None,
            _ => Some(value),
        }
    }
}
