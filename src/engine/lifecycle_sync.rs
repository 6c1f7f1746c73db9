// ==========================================
// 项目进度管理系统 - 生命周期同步规则
// ==========================================
// 职责: 模块进度变化 → 项目缓存进度 + 状态自动流转
// 红线: 本文件只做决策，不做持久化；事务与版本校验由仓储层负责
// ==========================================
// 自动流转规则（顺序执行，命中即停）:
// 1) mean == 0   且 status == initial_contact        → 不变（显式保留）
// 2) mean == 100 且 status == project_implementation → project_acceptance
//    直接更新项目进度时同时记录 actual_end_date = today
// 3) mean > 0    且 status == contract_signed        → project_implementation
// 4) 其他 → 不变
// ==========================================

use crate::domain::project::Project;
use crate::domain::types::{ProjectSource, ProjectStatus};
use crate::engine::module_aggregator::ModuleAggregator;
use crate::engine::stage_table::StageTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// 同步触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    ModuleRollup, // 模块增删改后汇总
    DirectUpdate, // 直接更新项目进度
}

/// 命中的流转规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRule {
    IdleAtInitialContact,
    ImplementationComplete,
    WorkStarted,
    NoRule,
}

impl TransitionRule {
    /// 规则对应的目标状态
    pub fn target(&self) -> Option<ProjectStatus> {
        match self {
            TransitionRule::ImplementationComplete => Some(ProjectStatus::ProjectAcceptance),
            TransitionRule::WorkStarted => Some(ProjectStatus::ProjectImplementation),
            TransitionRule::IdleAtInitialContact | TransitionRule::NoRule => None,
        }
    }
}

/// 状态流转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ProjectStatus,
    pub to: ProjectStatus,
    pub rule: TransitionRule,
}

/// 同步决策结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub trigger: SyncTrigger,
    pub progress: i32, // 写回项目缓存列的值
    pub transition: Option<StatusTransition>,
    pub actual_end_date: Option<NaiveDate>,
}

impl SyncOutcome {
    /// 流转后的状态
    pub fn status_after(&self, current: ProjectStatus) -> ProjectStatus {
        self.transition.map(|t| t.to).unwrap_or(current)
    }
}

/// 显式状态变更错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusChangeError {
    #[error("状态 {status} 不属于 {project_source} 项目的状态族")]
    WrongFamily {
        project_source: ProjectSource,
        status: ProjectStatus,
    },

    #[error("终态 {from} 不允许变更为 {to}")]
    FromTerminal {
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("状态不允许回退: {from} → {to}")]
    Regression {
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

// ==========================================
// LifecycleSync - 生命周期同步
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSync {
    aggregator: ModuleAggregator,
    auto_transition_enabled: bool,
}

impl Default for LifecycleSync {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LifecycleSync {
    /// # 参数
    /// - auto_transition_enabled: 关闭时只写回缓存进度，不做状态流转
    pub fn new(auto_transition_enabled: bool) -> Self {
        Self {
            aggregator: ModuleAggregator::new(),
            auto_transition_enabled,
        }
    }

    pub fn auto_transition_enabled(&self) -> bool {
        self.auto_transition_enabled
    }

    /// 匹配自动流转规则（不考虑开关）
    pub fn match_rule(status: ProjectStatus, mean: i32) -> TransitionRule {
        if mean == 0 && status == ProjectStatus::InitialContact {
            return TransitionRule::IdleAtInitialContact;
        }
        if mean == 100 && status == ProjectStatus::ProjectImplementation {
            return TransitionRule::ImplementationComplete;
        }
        if mean > 0 && status == ProjectStatus::ContractSigned {
            return TransitionRule::WorkStarted;
        }
        TransitionRule::NoRule
    }

    /// 模块变化后的同步决策
    ///
    /// # 参数
    /// - project: 事务内读取的项目快照
    /// - progresses: 事务内读取的全部模块进度
    ///
    /// # 返回
    /// - None: 项目没有模块，不做任何修改
    /// - Some(outcome): 缓存进度 = 模块均值，及可能的状态流转
    #[instrument(skip(self, project, progresses), fields(
        project_id = project.id,
        status = %project.status,
        module_count = progresses.len()
    ))]
    pub fn on_modules_changed(&self, project: &Project, progresses: &[i32]) -> Option<SyncOutcome> {
        let aggregate = self.aggregator.aggregate(progresses);
        if aggregate.is_empty() {
            debug!("项目没有模块，跳过同步");
            return None;
        }

        Some(self.decide(project, aggregate.mean, SyncTrigger::ModuleRollup, None))
    }

    /// 直接更新项目进度时的同步决策
    ///
    /// # 参数
    /// - progress: 新进度（调用方已校验 0..=100）
    /// - today: 实施完成进入验收时记录的实际结束日期
    #[instrument(skip(self, project), fields(project_id = project.id, status = %project.status))]
    pub fn on_direct_update(&self, project: &Project, progress: i32, today: NaiveDate) -> SyncOutcome {
        self.decide(project, progress, SyncTrigger::DirectUpdate, Some(today))
    }

    fn decide(
        &self,
        project: &Project,
        mean: i32,
        trigger: SyncTrigger,
        today: Option<NaiveDate>,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome {
            trigger,
            progress: mean,
            transition: None,
            actual_end_date: None,
        };

        // 纵向项目的进度只由状态决定，模块不驱动流转
        if !self.auto_transition_enabled || project.project_source.uses_vertical_statuses() {
            return outcome;
        }

        let rule = Self::match_rule(project.status, mean);
        match rule.target() {
            Some(to) => {
                info!(
                    from = %project.status,
                    to = %to,
                    rule = ?rule,
                    mean,
                    "项目状态自动流转"
                );
                outcome.transition = Some(StatusTransition {
                    from: project.status,
                    to,
                    rule,
                });
                if rule == TransitionRule::ImplementationComplete
                    && trigger == SyncTrigger::DirectUpdate
                {
                    outcome.actual_end_date = today;
                }
            }
            None => debug!(rule = ?rule, mean, "无状态流转"),
        }

        outcome
    }

    // ==========================================
    // 显式状态变更校验
    // ==========================================

    /// 校验显式状态变更
    ///
    /// 规则:
    /// - 目标状态必须属于项目来源对应的状态族
    /// - 终态不可再变更（相同状态视为无操作）
    /// - 不可回退；进入中止类终态（不再跟进 / 未通过）不受顺序限制
    pub fn check_status_change(
        project_source: ProjectSource,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> Result<(), StatusChangeError> {
        if project_source.uses_vertical_statuses() != to.is_vertical_family() {
            return Err(StatusChangeError::WrongFamily {
                project_source,
                status: to,
            });
        }
        if from == to {
            return Ok(());
        }

        // 纵向项目上的旧横向状态按兼容表映射后再比较
        let Some(current) = StageTable::lookup(project_source, from) else {
            // 表外的当前状态（历史脏数据）允许修正为任意合法状态
            return Ok(());
        };

        if current.status.is_terminal() {
            return Err(StatusChangeError::FromTerminal { from, to });
        }
        if to.is_termination() {
            return Ok(());
        }
        if StageTable::stage_number(to) < current.stage {
            return Err(StatusChangeError::Regression { from, to });
        }
        Ok(())
    }
}
