// ==========================================
// 项目进度管理系统 - 模块 API
// ==========================================
// 职责: 模块增删改查、模块进度更新、进度历史、模块分工、周工作记录
// 红线: 每次模块变更提交后必须调用 on_module_changed 同步父项目
// ==========================================

use std::sync::Arc;

use chrono::Local;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::project_api::{normalize_members, validate_date_range};
use crate::config::ConfigManager;
use crate::domain::member::{MemberInput, ModuleAssignment};
use crate::domain::module::{ModuleUpdate, NewModule, ProjectModule};
use crate::domain::record::ModuleProgressRecord;
use crate::domain::types::ModuleStatus;
use crate::domain::work_record::{ModuleWorkRecord, NewWorkRecord, WorkRecordUpdate};
use crate::engine::{reconcile_module_state, LifecycleSync, SyncOutcome};
use crate::repository::{
    MemberRepository, ModuleInsert, ModuleRepository, ProgressRecordRepository, ProgressWrite,
    ProjectRepository, WorkRecordRepository, WorkRecordWrite,
};

/// 工作记录列表默认条数
pub const DEFAULT_WORK_RECORD_LIMIT: usize = 10;

/// 按当前配置构造生命周期同步规则
pub(crate) fn lifecycle_sync_from(config: &ConfigManager) -> ApiResult<LifecycleSync> {
    let enabled = config
        .get_auto_transition_enabled()
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    Ok(LifecycleSync::new(enabled))
}

/// 模块变更结果（模块 + 父项目同步结果）
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleChange {
    pub module: Option<ProjectModule>, // 删除时为 None
    pub sync: Option<SyncOutcome>,     // 项目已无模块时为 None
}

// ==========================================
// ModuleApi - 模块 API
// ==========================================
pub struct ModuleApi {
    module_repo: Arc<ModuleRepository>,
    project_repo: Arc<ProjectRepository>,
    record_repo: Arc<ProgressRecordRepository>,
    member_repo: Arc<MemberRepository>,
    work_record_repo: Arc<WorkRecordRepository>,
    config: Arc<ConfigManager>,
}

impl ModuleApi {
    /// 创建新的 ModuleApi 实例
    pub fn new(
        module_repo: Arc<ModuleRepository>,
        project_repo: Arc<ProjectRepository>,
        record_repo: Arc<ProgressRecordRepository>,
        member_repo: Arc<MemberRepository>,
        work_record_repo: Arc<WorkRecordRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            module_repo,
            project_repo,
            record_repo,
            member_repo,
            work_record_repo,
            config,
        }
    }

    /// 查询项目的所有模块
    pub fn list_modules(&self, project_id: i64) -> ApiResult<Vec<ProjectModule>> {
        self.project_repo.get(project_id)?;
        Ok(self.module_repo.list_by_project(project_id)?)
    }

    /// 查询单个模块
    pub fn get_module(&self, module_id: i64) -> ApiResult<ProjectModule> {
        Ok(self.module_repo.get(module_id)?)
    }

    /// 模块进度历史（最新在前）
    pub fn module_progress_history(&self, module_id: i64) -> ApiResult<Vec<ModuleProgressRecord>> {
        self.module_repo.get(module_id)?;
        Ok(self.record_repo.list_for_module(module_id)?)
    }

    /// 创建模块
    ///
    /// 按请求的状态协调初始进度（见 engine::module_state）
    #[instrument(skip(self, new_module), fields(name = %new_module.name))]
    pub fn create_module(&self, project_id: i64, new_module: &NewModule) -> ApiResult<ModuleChange> {
        let name = new_module.name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("模块名称不能为空".to_string()));
        }
        let progress = new_module.progress.unwrap_or(0);
        check_progress(progress)?;
        validate_date_range(new_module.start_date, new_module.end_date)?;

        // 先确认项目存在，避免外键错误信息暴露给调用方
        self.project_repo.get(project_id)?;

        let state = reconcile_module_state(progress, new_module.status);
        let module_id = self.module_repo.insert(
            &ModuleInsert {
                project_id,
                name,
                description: new_module.description.as_deref(),
                progress: state.progress,
                status: state.status,
                priority: new_module.priority.unwrap_or(1),
                start_date: new_module.start_date,
                end_date: new_module.end_date,
            },
            Local::now().naive_local(),
        )?;
        info!(
            module_id,
            progress = state.progress,
            status = %state.status,
            "模块已创建"
        );

        let sync = self.on_module_changed(project_id)?;
        Ok(ModuleChange {
            module: Some(self.module_repo.get(module_id)?),
            sync,
        })
    }

    /// 更新模块信息
    ///
    /// 状态变化时按新状态重新协调进度；读取、协调与写回在同一事务内完成
    #[instrument(skip(self, update))]
    pub fn update_module(&self, module_id: i64, update: &ModuleUpdate) -> ApiResult<ModuleChange> {
        let name = match update.name.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::InvalidInput("模块名称不能为空".to_string())),
            other => other.map(str::to_string),
        };

        let (before, after) = self.module_repo.update_with(
            module_id,
            Local::now().naive_local(),
            |module: &mut ProjectModule| -> ApiResult<()> {
                if let Some(name) = &name {
                    module.name = name.clone();
                }
                if let Some(description) = &update.description {
                    module.description = description.clone();
                }
                if let Some(priority) = update.priority {
                    module.priority = priority;
                }
                if let Some(start_date) = update.start_date {
                    module.start_date = start_date;
                }
                if let Some(end_date) = update.end_date {
                    module.end_date = end_date;
                }
                validate_date_range(module.start_date, module.end_date)?;

                if let Some(status) = update.status {
                    if status != module.status {
                        let state = reconcile_module_state(module.progress, Some(status));
                        module.progress = state.progress;
                        module.status = state.status;
                    }
                }
                Ok(())
            },
        )?;

        // 只有进度变化才影响父项目
        let sync = if after.progress != before.progress {
            info!(
                module_id,
                from = before.progress,
                to = after.progress,
                "模块状态变化引起进度调整"
            );
            self.on_module_changed(after.project_id)?
        } else {
            None
        };

        Ok(ModuleChange {
            module: Some(self.module_repo.get(module_id)?),
            sync,
        })
    }

    /// 更新模块进度
    ///
    /// 状态由进度推断（0 → 未开始，100 → 已完成，其余 → 进行中），并追加进度记录
    #[instrument(skip(self, notes))]
    pub fn update_module_progress(
        &self,
        module_id: i64,
        progress: i32,
        notes: Option<String>,
        updated_by: &str,
    ) -> ApiResult<ModuleChange> {
        check_progress(progress)?;
        let module = self.module_repo.get(module_id)?;

        let status = ModuleStatus::from_progress(progress);
        let record = ModuleProgressRecord::new(module_id, progress, notes, updated_by);
        self.module_repo.update_progress(
            module_id,
            progress,
            status,
            &record,
            Local::now().naive_local(),
        )?;

        let sync = self.on_module_changed(module.project_id)?;
        Ok(ModuleChange {
            module: Some(self.module_repo.get(module_id)?),
            sync,
        })
    }

    /// 删除模块
    #[instrument(skip(self))]
    pub fn delete_module(&self, module_id: i64) -> ApiResult<ModuleChange> {
        let project_id = self.module_repo.delete(module_id)?;
        info!(module_id, project_id, "模块已删除");

        let sync = self.on_module_changed(project_id)?;
        Ok(ModuleChange { module: None, sync })
    }

    // ==========================================
    // 模块分工
    // ==========================================

    /// 替换模块分工成员
    #[instrument(skip(self, members))]
    pub fn assign_members(
        &self,
        module_id: i64,
        members: &[MemberInput],
    ) -> ApiResult<Vec<ModuleAssignment>> {
        let members = normalize_members(members)?;
        self.module_repo.get(module_id)?;

        self.member_repo
            .replace_module_assignments(module_id, &members, Local::now().naive_local())?;
        info!(module_id, count = members.len(), "模块分工已更新");
        Ok(self.member_repo.list_module_assignments(module_id)?)
    }

    /// 查询模块分工（负责人在前）
    pub fn list_module_assignments(&self, module_id: i64) -> ApiResult<Vec<ModuleAssignment>> {
        self.module_repo.get(module_id)?;
        Ok(self.member_repo.list_module_assignments(module_id)?)
    }

    // ==========================================
    // 周工作记录
    // ==========================================

    /// 新增周工作记录
    ///
    /// # 错误
    /// - InvalidInput: 周期倒置、内容或填写人为空
    /// - BusinessRuleViolation: 与该模块已有记录周期重叠
    #[instrument(skip(self, record))]
    pub fn add_work_record(
        &self,
        module_id: i64,
        record: &NewWorkRecord,
        created_by: &str,
    ) -> ApiResult<ModuleWorkRecord> {
        let created_by = created_by.trim();
        if created_by.is_empty() {
            return Err(ApiError::InvalidInput("填写人不能为空".to_string()));
        }
        let record = NewWorkRecord {
            work_content: record.work_content.trim().to_string(),
            ..record.clone()
        };
        check_work_record(record.week_start, record.week_end, &record.work_content)?;
        self.module_repo.get(module_id)?;

        let write = self.work_record_repo.insert(
            module_id,
            &record,
            created_by,
            Local::now().naive_local(),
        )?;
        let saved = saved_or_overlap(write)?;
        info!(module_id, record_id = saved.id, week = %saved.week_label(), "工作记录已添加");
        Ok(saved)
    }

    /// 模块工作记录（周期新的在前）
    ///
    /// # 参数
    /// - limit: 最多返回条数，None 时取默认 10 条
    pub fn list_work_records(
        &self,
        module_id: i64,
        limit: Option<usize>,
    ) -> ApiResult<Vec<ModuleWorkRecord>> {
        self.module_repo.get(module_id)?;
        Ok(self
            .work_record_repo
            .list_for_module(module_id, limit.unwrap_or(DEFAULT_WORK_RECORD_LIMIT))?)
    }

    /// 模块最新一条工作记录（没有记录时为 None）
    pub fn latest_work_record(&self, module_id: i64) -> ApiResult<Option<ModuleWorkRecord>> {
        self.module_repo.get(module_id)?;
        Ok(self.work_record_repo.latest(module_id)?)
    }

    /// 更新周工作记录（排除自身后检查周期重叠）
    #[instrument(skip(self, update))]
    pub fn update_work_record(
        &self,
        record_id: i64,
        update: &WorkRecordUpdate,
    ) -> ApiResult<ModuleWorkRecord> {
        let write = self.work_record_repo.update_with(
            record_id,
            Local::now().naive_local(),
            |record: &mut ModuleWorkRecord| -> ApiResult<()> {
                update.apply_to(record);
                check_work_record(record.week_start, record.week_end, &record.work_content)
            },
        )?;
        saved_or_overlap(write)
    }

    /// 删除周工作记录
    #[instrument(skip(self))]
    pub fn delete_work_record(&self, record_id: i64) -> ApiResult<()> {
        self.work_record_repo.delete(record_id)?;
        info!(record_id, "工作记录已删除");
        Ok(())
    }

    /// 模块变更后同步父项目
    ///
    /// 在单个事务内: 汇总全部模块 → 写回缓存进度 → 按规则流转状态
    ///
    /// # 返回
    /// - Ok(None): 项目没有模块，未做修改
    /// - Ok(Some(outcome)): 写回的进度与状态流转
    #[instrument(skip(self))]
    pub fn on_module_changed(&self, project_id: i64) -> ApiResult<Option<SyncOutcome>> {
        let sync = lifecycle_sync_from(&self.config)?;

        let outcome = self.project_repo.update_progress_atomically(
            project_id,
            Local::now().naive_local(),
            None,
            |project, progresses| {
                let outcome = sync.on_modules_changed(project, progresses)?;
                let write = ProgressWrite {
                    progress: outcome.progress,
                    status: outcome.status_after(project.status),
                    actual_end_date: outcome.actual_end_date,
                };
                Some((write, outcome))
            },
        )?;

        Ok(outcome)
    }
}

fn check_progress(progress: i32) -> ApiResult<()> {
    if !(0..=100).contains(&progress) {
        return Err(ApiError::InvalidInput("进度值必须在0-100之间".to_string()));
    }
    Ok(())
}

fn check_work_record(
    week_start: chrono::NaiveDate,
    week_end: chrono::NaiveDate,
    work_content: &str,
) -> ApiResult<()> {
    if week_start > week_end {
        return Err(ApiError::InvalidInput(format!(
            "周期开始 {} 晚于结束 {}",
            week_start, week_end
        )));
    }
    if work_content.trim().is_empty() {
        return Err(ApiError::InvalidInput("工作内容不能为空".to_string()));
    }
    Ok(())
}

fn saved_or_overlap(write: WorkRecordWrite) -> ApiResult<ModuleWorkRecord> {
    match write {
        WorkRecordWrite::Saved(record) => Ok(record),
        WorkRecordWrite::Overlaps(existing) => Err(ApiError::BusinessRuleViolation(format!(
            "该周期与现有工作记录重叠 ({} 至 {})",
            existing.week_start, existing.week_end
        ))),
    }
}
