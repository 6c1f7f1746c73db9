// ==========================================
// 项目进度管理系统 - 项目 API
// ==========================================
// 职责: 项目增删改查、成员、状态变更、手动进度、直接更新进度、部门总览
// 红线: 返回给调用方的进度一律由 ProgressCalculator 实时计算
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::module_api::lifecycle_sync_from;
use crate::config::ConfigManager;
use crate::domain::member::{MemberInput, ProjectMember};
use crate::domain::module::{ModuleStats, ProjectModule};
use crate::domain::progress::{ProgressLimits, ProgressResult};
use crate::domain::project::{NewProject, Project, ProjectFilter, ProjectInfoUpdate};
use crate::domain::record::ProgressRecord;
use crate::domain::types::{MemberRole, ProjectSource, ProjectStatus};
use crate::engine::{
    LifecycleSync, ManualOverrideValidator, ModuleAggregator, ProgressCalculator, StageTable,
    SyncOutcome,
};
use crate::i18n;
use crate::repository::{
    MemberRepository, ModuleRepository, ProgressRecordRepository, ProgressWrite,
    ProjectRepository,
};

// ==========================================
// 视图类型
// ==========================================

/// 项目视图（实体 + 实时计算进度 + 模块统计）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    pub project: Project,
    pub computed: ProgressResult,
    pub module_stats: ModuleStats,
}

/// 状态分布
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub label: String,
    pub count: usize,
}

/// 总览中的项目摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub status: ProjectStatus,
    pub project_source: ProjectSource,
    pub partner: Option<String>,
    pub progress: ProgressResult,
    pub module_stats: ModuleStats,
    pub leaders: Vec<String>, // 负责人名称
    pub member_count: usize,  // 成员总数（含负责人）
}

/// 部门总览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentOverview {
    pub total_projects: usize,
    pub active_projects: usize, // 不含不再跟进 / 审核未通过
    pub average_progress: f64,  // 活跃项目计算进度均值，保留 1 位小数
    pub status_distribution: Vec<StatusCount>,
    pub projects: Vec<ProjectSummary>,
}

// ==========================================
// ProjectApi - 项目 API
// ==========================================
pub struct ProjectApi {
    project_repo: Arc<ProjectRepository>,
    module_repo: Arc<ModuleRepository>,
    record_repo: Arc<ProgressRecordRepository>,
    member_repo: Arc<MemberRepository>,
    config: Arc<ConfigManager>,
    calculator: ProgressCalculator,
    aggregator: ModuleAggregator,
    validator: ManualOverrideValidator,
}

impl ProjectApi {
    /// 创建新的 ProjectApi 实例
    pub fn new(
        project_repo: Arc<ProjectRepository>,
        module_repo: Arc<ModuleRepository>,
        record_repo: Arc<ProgressRecordRepository>,
        member_repo: Arc<MemberRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            project_repo,
            module_repo,
            record_repo,
            member_repo,
            config,
            calculator: ProgressCalculator::new(),
            aggregator: ModuleAggregator::new(),
            validator: ManualOverrideValidator::new(),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询单个项目
    pub fn get_project(&self, project_id: i64) -> ApiResult<ProjectView> {
        let project = self.project_repo.get(project_id)?;
        let modules = self.module_repo.list_by_project(project_id)?;
        Ok(self.build_view(project, &modules))
    }

    /// 按条件查询项目列表
    pub fn list_projects(&self, filter: &ProjectFilter) -> ApiResult<Vec<ProjectView>> {
        let projects = self.project_repo.list(filter)?;
        let mut modules_by_project = self.modules_by_project()?;

        Ok(projects
            .into_iter()
            .map(|project| {
                let modules = modules_by_project.remove(&project.id).unwrap_or_default();
                self.build_view(project, &modules)
            })
            .collect())
    }

    /// 进度历史（最新在前）
    pub fn progress_history(&self, project_id: i64) -> ApiResult<Vec<ProgressRecord>> {
        self.project_repo.get(project_id)?;
        Ok(self.record_repo.list_for_project(project_id)?)
    }

    /// 项目成员（负责人在前）
    pub fn list_project_members(&self, project_id: i64) -> ApiResult<Vec<ProjectMember>> {
        self.project_repo.get(project_id)?;
        Ok(self.member_repo.list_project_members(project_id)?)
    }

    /// 查询 (来源, 状态) 的进度限制
    ///
    /// # 参数
    /// - project_source / status: 上游传入的编码，无法识别时返回 InvalidInput
    pub fn progress_limits(&self, project_source: &str, status: &str) -> ApiResult<ProgressLimits> {
        let source: ProjectSource = project_source.parse()?;
        let status: ProjectStatus = status.parse()?;

        StageTable::progress_limits(source, status).ok_or_else(|| {
            ApiError::InvalidInput(format!("状态 {} 不适用于 {} 项目", status, source))
        })
    }

    /// 部门总览
    #[instrument(skip(self))]
    pub fn department_overview(&self) -> ApiResult<DepartmentOverview> {
        let projects = self.project_repo.list(&ProjectFilter::default())?;
        let mut modules_by_project = self.modules_by_project()?;
        let mut members_by_project: HashMap<i64, Vec<ProjectMember>> = HashMap::new();
        for member in self.member_repo.list_all_members()? {
            members_by_project
                .entry(member.project_id)
                .or_default()
                .push(member);
        }

        let mut counts: HashMap<ProjectStatus, usize> = HashMap::new();
        let mut active_projects = 0usize;
        let mut active_total = 0i64;
        let mut summaries = Vec::with_capacity(projects.len());

        for project in projects {
            *counts.entry(project.status).or_insert(0) += 1;

            let modules = modules_by_project.remove(&project.id).unwrap_or_default();
            let members = members_by_project.remove(&project.id).unwrap_or_default();
            let view = self.build_view(project, &modules);

            if !view.project.status.is_termination() {
                active_projects += 1;
                active_total += i64::from(view.computed.progress);
            }

            summaries.push(ProjectSummary {
                id: view.project.id,
                name: view.project.name,
                status: view.project.status,
                project_source: view.project.project_source,
                partner: view.project.partner,
                progress: view.computed,
                module_stats: view.module_stats,
                leaders: members
                    .iter()
                    .filter(|m| m.role == MemberRole::Leader)
                    .map(|m| m.member.clone())
                    .collect(),
                member_count: members.len(),
            });
        }

        let average_progress = if active_projects > 0 {
            (active_total as f64 / active_projects as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        let status_distribution = ProjectStatus::ALL
            .into_iter()
            .filter_map(|status| {
                counts.get(&status).map(|count| StatusCount {
                    status,
                    label: i18n::t(&status.label_key()),
                    count: *count,
                })
            })
            .collect();

        Ok(DepartmentOverview {
            total_projects: summaries.len(),
            active_projects,
            average_progress,
            status_distribution,
            projects: summaries,
        })
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 创建项目
    ///
    /// 状态取来源的第一阶段，缓存进度为 0
    #[instrument(skip(self, new_project), fields(name = %new_project.name))]
    pub fn create_project(&self, new_project: &NewProject) -> ApiResult<ProjectView> {
        let name = new_project.name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("项目名称不能为空".to_string()));
        }
        if matches!(new_project.amount, Some(amount) if amount < 0.0) {
            return Err(ApiError::InvalidInput("项目金额不能为负数".to_string()));
        }
        validate_date_range(new_project.start_date, new_project.end_date)?;
        let members = normalize_members(&new_project.members)?;

        let source = match new_project.project_source {
            Some(source) => source,
            None => self
                .config
                .get_default_project_source()
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?,
        };
        let status = source.initial_status();

        let id = self.project_repo.insert(
            name,
            new_project.description.as_deref(),
            source,
            status,
            new_project.partner.as_deref(),
            new_project.amount,
            new_project.start_date,
            new_project.end_date,
            Local::now().naive_local(),
        )?;
        if !members.is_empty() {
            self.member_repo
                .replace_project_members(id, &members, Local::now().naive_local())?;
        }

        info!(project_id = id, project_source = %source, status = %status, "项目已创建");
        self.get_project(id)
    }

    /// 更新项目基本信息
    ///
    /// 可选字段 Some(None) 表示清空；写回带乐观锁检查
    pub fn update_project_info(
        &self,
        project_id: i64,
        update: &ProjectInfoUpdate,
    ) -> ApiResult<ProjectView> {
        if matches!(update.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ApiError::InvalidInput("项目名称不能为空".to_string()));
        }
        if matches!(update.amount, Some(Some(amount)) if amount < 0.0) {
            return Err(ApiError::InvalidInput("项目金额不能为负数".to_string()));
        }

        let mut project = self.project_repo.get(project_id)?;
        update.apply_to(&mut project);
        validate_date_range(project.start_date, project.end_date)?;

        self.project_repo
            .update_info(&project, Local::now().naive_local())?;
        self.get_project(project_id)
    }

    /// 替换项目成员
    ///
    /// # 错误
    /// - InvalidInput: 成员名称为空或重复
    #[instrument(skip(self, members))]
    pub fn set_project_members(
        &self,
        project_id: i64,
        members: &[MemberInput],
    ) -> ApiResult<Vec<ProjectMember>> {
        let members = normalize_members(members)?;
        self.project_repo.get(project_id)?;

        self.member_repo
            .replace_project_members(project_id, &members, Local::now().naive_local())?;
        info!(project_id, count = members.len(), "项目成员已更新");
        Ok(self.member_repo.list_project_members(project_id)?)
    }

    /// 删除项目（模块与进度记录级联删除）
    #[instrument(skip(self))]
    pub fn delete_project(&self, project_id: i64) -> ApiResult<()> {
        self.project_repo.delete(project_id)?;
        info!(project_id, "项目已删除");
        Ok(())
    }

    /// 显式变更项目状态
    ///
    /// # 参数
    /// - status: 上游传入的状态编码
    ///
    /// # 错误
    /// - InvalidInput: 无法识别的编码，或不属于该项目来源的状态族
    /// - InvalidStateTransition: 回退或离开终态
    #[instrument(skip(self))]
    pub fn update_status(&self, project_id: i64, status: &str) -> ApiResult<ProjectView> {
        let target: ProjectStatus = status.parse()?;
        let mut project = self.project_repo.get(project_id)?;

        LifecycleSync::check_status_change(project.project_source, project.status, target)?;
        if project.status == target {
            return self.get_project(project_id);
        }

        // 缓存列随状态刷新: 有模块时为模块均值，无模块时为新状态下的计算进度
        let from = project.status;
        project.status = target;
        let modules = self.module_repo.list_by_project(project_id)?;
        let cached = if modules.is_empty() {
            self.calculator.compute(&project, &modules).progress
        } else {
            self.aggregator.aggregate_modules(&modules).mean
        };

        self.project_repo.update_status(
            project_id,
            project.revision,
            target,
            cached,
            Local::now().naive_local(),
        )?;
        info!(from = %from, to = %target, progress = cached, "项目状态已变更");

        // 手动进度保留，但提示已失效（展示时回退默认值）
        if let Some(stale) = self.validator.stale_manual(&project) {
            warn!(
                project_id,
                manual_progress = stale,
                status = %target,
                "状态变更后手动进度已不适用"
            );
        }

        self.get_project(project_id)
    }

    /// 设置手动进度
    ///
    /// # 错误
    /// - InvalidState: 非横向项目或非前期阶段
    /// - OutOfRange{lo, hi}: 超出当前阶段区间
    #[instrument(skip(self))]
    pub fn set_manual_progress(&self, project_id: i64, value: i32) -> ApiResult<ProjectView> {
        let project = self.project_repo.get(project_id)?;
        let value = self.validator.validate(&project, value)?;

        self.project_repo.update_manual_progress(
            project_id,
            project.revision,
            Some(value),
            Local::now().naive_local(),
        )?;
        info!(manual_progress = value, "手动进度已设置");
        self.get_project(project_id)
    }

    /// 清除手动进度
    pub fn clear_manual_progress(&self, project_id: i64) -> ApiResult<ProjectView> {
        let project = self.project_repo.get(project_id)?;
        if project.manual_progress.is_some() {
            self.project_repo.update_manual_progress(
                project_id,
                project.revision,
                None,
                Local::now().naive_local(),
            )?;
        }
        self.get_project(project_id)
    }

    /// 直接更新项目进度
    ///
    /// 写缓存进度、按生命周期规则流转状态、追加进度记录（同一事务）
    #[instrument(skip(self, notes))]
    pub fn update_project_progress(
        &self,
        project_id: i64,
        progress: i32,
        notes: Option<String>,
        updated_by: &str,
    ) -> ApiResult<(ProjectView, SyncOutcome)> {
        if !(0..=100).contains(&progress) {
            return Err(ApiError::InvalidInput("进度值必须在0-100之间".to_string()));
        }

        let sync = lifecycle_sync_from(&self.config)?;
        let now = Local::now().naive_local();
        let today = now.date();
        let record = ProgressRecord::new(project_id, progress, notes, updated_by);

        let outcome = self
            .project_repo
            .update_progress_atomically(project_id, now, Some(&record), |project, _| {
                let outcome = sync.on_direct_update(project, progress, today);
                let write = ProgressWrite {
                    progress: outcome.progress,
                    status: outcome.status_after(project.status),
                    actual_end_date: outcome.actual_end_date,
                };
                Some((write, outcome))
            })?
            .ok_or_else(|| ApiError::InternalError("进度更新未产生结果".to_string()))?;

        Ok((self.get_project(project_id)?, outcome))
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn build_view(&self, project: Project, modules: &[ProjectModule]) -> ProjectView {
        let computed = self.calculator.compute(&project, modules);
        let module_stats = self.aggregator.stats(modules);
        ProjectView {
            project,
            computed,
            module_stats,
        }
    }

    fn modules_by_project(&self) -> ApiResult<HashMap<i64, Vec<ProjectModule>>> {
        let mut grouped: HashMap<i64, Vec<ProjectModule>> = HashMap::new();
        for module in self.module_repo.list_all()? {
            grouped.entry(module.project_id).or_default().push(module);
        }
        Ok(grouped)
    }
}

/// 开始日期不能晚于结束日期
pub(crate) fn validate_date_range(
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> ApiResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ApiError::InvalidInput(format!(
                "开始日期 {} 晚于结束日期 {}",
                start, end
            )));
        }
    }
    Ok(())
}

/// 规整成员列表: 去除首尾空白，拒绝空名称与重复成员
pub(crate) fn normalize_members(members: &[MemberInput]) -> ApiResult<Vec<MemberInput>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(members.len());
    for input in members {
        let member = input.member.trim();
        if member.is_empty() {
            return Err(ApiError::InvalidInput("成员名称不能为空".to_string()));
        }
        if !seen.insert(member.to_string()) {
            return Err(ApiError::InvalidInput(format!("成员重复: {}", member)));
        }
        normalized.push(MemberInput {
            member: member.to_string(),
            role: Some(input.role_or_default()),
        });
    }
    Ok(normalized)
}
