// ==========================================
// 项目进度管理系统 - 进度计算引擎
// ==========================================
// 职责: 由 (来源, 状态, 手动进度, 模块汇总) 计算展示进度
// 红线: 纯函数，不读缓存列，不抛错；无法识别时回退为 0 并给出说明
// ==========================================
// 判定顺序:
// 1) 纵向项目 → 状态固定值（不看模块/手动）
// 2) 横向终态 → 固定值
// 3) 交付阶段 → 有模块则区间映射，否则区间默认值
// 4) 前期阶段 → 模块 > 手动（仅横向且在区间内）> 默认
// 5) 表外组合 → 0 (error)
// ==========================================

use crate::domain::module::ProjectModule;
use crate::domain::progress::{ProgressKind, ProgressResult, ProgressSource};
use crate::domain::project::Project;
use crate::domain::types::{ProjectSource, ProjectStatus};
use crate::engine::module_aggregator::{ModuleAggregate, ModuleAggregator};
use crate::engine::stage_table::{ProgressRange, StageEntry, StageRule, StageTable};
use crate::i18n;
use serde_json::json;
use tracing::{instrument, warn};

/// 计算输入（与存储解耦）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressInput {
    pub project_source: ProjectSource,
    pub status: ProjectStatus,
    pub manual_progress: Option<i32>,
    pub modules: ModuleAggregate,
}

// ==========================================
// ProgressCalculator - 进度计算引擎
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressCalculator {
    aggregator: ModuleAggregator,
}

impl ProgressCalculator {
    pub fn new() -> Self {
        Self {
            aggregator: ModuleAggregator::new(),
        }
    }

    /// 计算项目展示进度
    ///
    /// # 参数
    /// - project: 项目（只读取 project_source / status / manual_progress）
    /// - modules: 项目当前全部模块
    ///
    /// # 返回
    /// - ProgressResult: 进度与来源说明；相同输入恒得相同结果
    #[instrument(skip(self, project, modules), fields(
        project_id = project.id,
        status = %project.status,
        module_count = modules.len()
    ))]
    pub fn compute(&self, project: &Project, modules: &[ProjectModule]) -> ProgressResult {
        let input = ProgressInput {
            project_source: project.project_source,
            status: project.status,
            manual_progress: project.manual_progress,
            modules: self.aggregator.aggregate_modules(modules),
        };
        self.compute_input(&input)
    }

    /// 基于已汇总的输入计算
    pub fn compute_input(&self, input: &ProgressInput) -> ProgressResult {
        let Some(entry) = StageTable::lookup(input.project_source, input.status) else {
            return Self::unknown(input);
        };

        match entry.rule {
            StageRule::Vertical(value) => Self::vertical(&entry, value),
            StageRule::Terminal(value) => Self::terminal(&entry, value),
            StageRule::Mapped(range) => {
                if input.modules.is_empty() {
                    Self::stage_default(&entry, range, ProgressKind::DeliveryStage, None)
                } else {
                    Self::from_modules(&entry, range, ProgressKind::DeliveryStage, input.modules)
                }
            }
            StageRule::Front(range) => Self::front_stage(&entry, range, input),
        }
    }

    // ==========================================
    // 前期阶段: 模块 > 手动 > 默认
    // ==========================================
    fn front_stage(entry: &StageEntry, range: ProgressRange, input: &ProgressInput) -> ProgressResult {
        // 优先级1: 模块（即使存在手动值也以模块为准）
        if !input.modules.is_empty() {
            return Self::from_modules(entry, range, ProgressKind::FrontStage, input.modules);
        }

        // 优先级2: 手动（仅横向项目）
        let manual = match input.project_source {
            ProjectSource::Horizontal => input.manual_progress,
            ProjectSource::Vertical | ProjectSource::SelfDeveloped => None,
        };

        match manual {
            Some(value) if range.contains(value) => {
                let progress = value.to_string();
                let min = range.min.to_string();
                let max = range.max.to_string();
                ProgressResult {
                    progress: value,
                    kind: ProgressKind::FrontStage,
                    stage: entry.stage,
                    label: entry.label(),
                    source: ProgressSource::Manual,
                    info: i18n::t_with_args(
                        "progress.manual",
                        &[("progress", &progress), ("min", &min), ("max", &max)],
                    ),
                    detail: None,
                }
            }
            Some(value) => {
                // 软失败: 状态变更后遗留的手动值，回退默认值
                warn!(
                    status = %input.status,
                    manual_progress = value,
                    min = range.min,
                    max = range.max,
                    "手动进度超出当前阶段区间，回退默认值"
                );
                let violation = json!({
                    "violation": "manual_out_of_range",
                    "manual_progress": value,
                    "min": range.min,
                    "max": range.max,
                });
                Self::stage_default(entry, range, ProgressKind::FrontStage, Some((value, violation)))
            }
            // 优先级3: 默认
            None => Self::stage_default(entry, range, ProgressKind::FrontStage, None),
        }
    }

    // ==========================================
    // 结果构造
    // ==========================================

    fn from_modules(
        entry: &StageEntry,
        range: ProgressRange,
        kind: ProgressKind,
        modules: ModuleAggregate,
    ) -> ProgressResult {
        let progress = range.interpolate(modules.mean);
        let count = modules.count.to_string();
        let mean = modules.mean.to_string();
        let min = range.min.to_string();
        let max = range.max.to_string();
        let value = progress.to_string();
        ProgressResult {
            progress,
            kind,
            stage: entry.stage,
            label: entry.label(),
            source: ProgressSource::Modules,
            info: i18n::t_with_args(
                "progress.from_modules",
                &[
                    ("count", &count),
                    ("mean", &mean),
                    ("min", &min),
                    ("max", &max),
                    ("progress", &value),
                ],
            ),
            detail: Some(json!({
                "module_count": modules.count,
                "mean": modules.mean,
                "min": range.min,
                "max": range.max,
            })),
        }
    }

    fn stage_default(
        entry: &StageEntry,
        range: ProgressRange,
        kind: ProgressKind,
        violation: Option<(i32, serde_json::Value)>,
    ) -> ProgressResult {
        let label = entry.label();
        let progress = range.default.to_string();
        let (info, detail) = match violation {
            Some((manual, detail)) => {
                let manual = manual.to_string();
                let min = range.min.to_string();
                let max = range.max.to_string();
                (
                    i18n::t_with_args(
                        "progress.manual_out_of_range",
                        &[
                            ("manual", &manual),
                            ("min", &min),
                            ("max", &max),
                            ("progress", &progress),
                        ],
                    ),
                    Some(detail),
                )
            }
            None => (
                i18n::t_with_args(
                    "progress.stage_default",
                    &[("label", &label), ("progress", &progress)],
                ),
                None,
            ),
        };

        ProgressResult {
            progress: range.default,
            kind,
            stage: entry.stage,
            label,
            source: ProgressSource::Default,
            info,
            detail,
        }
    }

    fn vertical(entry: &StageEntry, value: i32) -> ProgressResult {
        let label = entry.label();
        let progress = value.to_string();
        let (info, detail) = match entry.legacy_status {
            Some(legacy) => (
                i18n::t_with_args(
                    "progress.vertical_legacy_status",
                    &[
                        ("status", legacy.to_db_str()),
                        ("label", &label),
                        ("progress", &progress),
                    ],
                ),
                Some(json!({ "legacy_status": legacy.to_db_str() })),
            ),
            None => (
                i18n::t_with_args(
                    "progress.vertical_status",
                    &[("label", &label), ("progress", &progress)],
                ),
                None,
            ),
        };

        ProgressResult {
            progress: value,
            kind: ProgressKind::Vertical,
            stage: entry.stage,
            label,
            source: ProgressSource::Status,
            info,
            detail,
        }
    }

    fn terminal(entry: &StageEntry, value: i32) -> ProgressResult {
        let label = entry.label();
        let progress = value.to_string();
        ProgressResult {
            progress: value,
            kind: ProgressKind::Terminal,
            stage: entry.stage,
            info: i18n::t_with_args(
                "progress.terminal",
                &[("label", &label), ("progress", &progress)],
            ),
            label,
            source: ProgressSource::Terminal,
            detail: None,
        }
    }

    fn unknown(input: &ProgressInput) -> ProgressResult {
        warn!(
            status = %input.status,
            project_source = %input.project_source,
            "状态不在阶段表中，进度按 0 处理"
        );
        ProgressResult {
            progress: 0,
            kind: ProgressKind::Unknown,
            stage: 0,
            label: i18n::t("status.unknown"),
            source: ProgressSource::Error,
            info: i18n::t_with_args(
                "progress.unknown_status",
                &[
                    ("status", input.status.to_db_str()),
                    ("source", input.project_source.to_db_str()),
                ],
            ),
            detail: None,
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ModuleStatus;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn project(source: ProjectSource, status: ProjectStatus, manual: Option<i32>) -> Project {
        Project {
            id: 1,
            name: "测试项目".to_string(),
            description: None,
            partner: None,
            amount: None,
            status,
            project_source: source,
            progress: 0,
            manual_progress: manual,
            start_date: None,
            end_date: None,
            actual_end_date: None,
            revision: 0,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn modules(progresses: &[i32]) -> Vec<ProjectModule> {
        progresses
            .iter()
            .enumerate()
            .map(|(i, p)| ProjectModule {
                id: i as i64 + 1,
                project_id: 1,
                name: format!("模块{}", i + 1),
                description: None,
                progress: *p,
                status: ModuleStatus::from_progress(*p),
                priority: 1,
                start_date: None,
                end_date: None,
                created_at: ts(),
                updated_at: ts(),
            })
            .collect()
    }

    fn input(
        source: ProjectSource,
        status: ProjectStatus,
        manual: Option<i32>,
        progresses: &[i32],
    ) -> ProgressInput {
        ProgressInput {
            project_source: source,
            status,
            manual_progress: manual,
            modules: ModuleAggregator::new().aggregate(progresses),
        }
    }

    // ===== 场景 A-D =====

    #[test]
    fn test_contract_signed_defaults_to_35() {
        let calc = ProgressCalculator::new();
        let p = project(ProjectSource::Horizontal, ProjectStatus::ContractSigned, None);
        let result = calc.compute(&p, &[]);
        assert_eq!(result.progress, 35);
        assert_eq!(result.source, ProgressSource::Default);
        assert_eq!(result.kind, ProgressKind::FrontStage);
        assert_eq!(result.stage, 5);
    }

    #[test]
    fn test_valid_manual_value_is_used() {
        let calc = ProgressCalculator::new();
        let p = project(ProjectSource::Horizontal, ProjectStatus::ContractSigned, Some(30));
        let result = calc.compute(&p, &[]);
        assert_eq!(result.progress, 30);
        assert_eq!(result.source, ProgressSource::Manual);
    }

    #[test]
    fn test_implementation_maps_module_mean() {
        let calc = ProgressCalculator::new();
        let p = project(
            ProjectSource::Horizontal,
            ProjectStatus::ProjectImplementation,
            None,
        );
        let result = calc.compute(&p, &modules(&[40, 60]));
        assert_eq!(result.progress, 60);
        assert_eq!(result.source, ProgressSource::Modules);
        let detail = result.detail.expect("模块映射应携带 detail");
        assert_eq!(detail["module_count"], 2);
        assert_eq!(detail["mean"], 50);
    }

    #[test]
    fn test_vertical_ignores_modules_and_manual() {
        let calc = ProgressCalculator::new();
        let p = project(
            ProjectSource::Vertical,
            ProjectStatus::VerticalApproved,
            Some(30),
        );
        let result = calc.compute(&p, &modules(&[10, 20]));
        assert_eq!(result.progress, 100);
        assert_eq!(result.source, ProgressSource::Status);
        assert_eq!(result.kind, ProgressKind::Vertical);
    }

    // ===== 交付阶段默认值 =====

    #[test]
    fn test_delivery_defaults_without_modules() {
        let calc = ProgressCalculator::new();
        for (status, expected) in [
            (ProjectStatus::ProjectImplementation, 60),
            (ProjectStatus::ProjectAcceptance, 88),
            (ProjectStatus::WarrantyPeriod, 95),
        ] {
            let result = calc.compute_input(&input(ProjectSource::Horizontal, status, None, &[]));
            assert_eq!(result.progress, expected, "{:?}", status);
            assert_eq!(result.source, ProgressSource::Default);
            assert_eq!(result.kind, ProgressKind::DeliveryStage);
        }
    }

    // ===== 性质 =====

    #[test]
    fn test_priority_modules_over_manual() {
        let calc = ProgressCalculator::new();
        let result = calc.compute_input(&input(
            ProjectSource::Horizontal,
            ProjectStatus::ContractSigned,
            Some(30),
            &[100],
        ));
        assert_eq!(result.source, ProgressSource::Modules);
        assert_eq!(result.progress, 35);
    }

    #[test]
    fn test_monotonic_interpolation_through_calculator() {
        let calc = ProgressCalculator::new();
        for status in [
            ProjectStatus::InitialContact,
            ProjectStatus::ContractSigned,
            ProjectStatus::ProjectImplementation,
            ProjectStatus::ProjectAcceptance,
            ProjectStatus::WarrantyPeriod,
        ] {
            let mut prev = -1;
            for mean in 0..=100 {
                let result =
                    calc.compute_input(&input(ProjectSource::Horizontal, status, None, &[mean]));
                assert!(result.progress >= prev, "{:?} 在 mean={} 时非单调", status, mean);
                prev = result.progress;
            }
            let bounds = StageTable::lookup(ProjectSource::Horizontal, status)
                .unwrap()
                .rule
                .bounds();
            let at_zero =
                calc.compute_input(&input(ProjectSource::Horizontal, status, None, &[0]));
            assert_eq!(at_zero.progress, bounds.min);
            assert_eq!(prev, bounds.max);
        }
    }

    #[test]
    fn test_idempotent() {
        let calc = ProgressCalculator::new();
        let p = project(ProjectSource::Horizontal, ProjectStatus::ProposalSubmitted, Some(40));
        let m = modules(&[]);
        assert_eq!(calc.compute(&p, &m), calc.compute(&p, &m));

        let p = project(ProjectSource::Horizontal, ProjectStatus::WarrantyPeriod, None);
        let m = modules(&[33, 67, 90]);
        assert_eq!(calc.compute(&p, &m), calc.compute(&p, &m));
    }

    #[test]
    fn test_terminal_fixation() {
        let calc = ProgressCalculator::new();
        let cases = [
            (ProjectSource::Horizontal, ProjectStatus::NoFollowUp, 0),
            (ProjectSource::Horizontal, ProjectStatus::PostWarranty, 100),
            (ProjectSource::SelfDeveloped, ProjectStatus::NoFollowUp, 0),
            (ProjectSource::Vertical, ProjectStatus::VerticalApproved, 100),
            (ProjectSource::Vertical, ProjectStatus::VerticalRejected, 0),
        ];
        for (source, status, expected) in cases {
            for progresses in [&[][..], &[0, 50][..], &[100][..]] {
                let result = calc.compute_input(&input(source, status, Some(3), progresses));
                assert_eq!(result.progress, expected, "{:?}/{:?}", source, status);
            }
        }
        let result =
            calc.compute_input(&input(ProjectSource::Horizontal, ProjectStatus::NoFollowUp, None, &[]));
        assert_eq!(result.stage, 0);
        assert_eq!(result.source, ProgressSource::Terminal);
    }

    // ===== 软失败 =====

    #[test]
    fn test_stale_manual_value_falls_back_to_default() {
        let calc = ProgressCalculator::new();
        // 手动值 5 在 [0,5] 有效，状态推进到 contract_signed 后失效
        let result = calc.compute_input(&input(
            ProjectSource::Horizontal,
            ProjectStatus::ContractSigned,
            Some(5),
            &[],
        ));
        assert_eq!(result.progress, 35);
        assert_eq!(result.source, ProgressSource::Default);
        let detail = result.detail.expect("越界应记录在 detail");
        assert_eq!(detail["violation"], "manual_out_of_range");
        assert_eq!(detail["manual_progress"], 5);
    }

    #[test]
    fn test_self_developed_ignores_manual() {
        let calc = ProgressCalculator::new();
        let result = calc.compute_input(&input(
            ProjectSource::SelfDeveloped,
            ProjectStatus::ContractSigned,
            Some(30),
            &[],
        ));
        assert_eq!(result.progress, 35);
        assert_eq!(result.source, ProgressSource::Default);

        let result = calc.compute_input(&input(
            ProjectSource::SelfDeveloped,
            ProjectStatus::ProjectImplementation,
            None,
            &[100],
        ));
        assert_eq!(result.progress, 85);
    }

    #[test]
    fn test_vertical_status_on_horizontal_project_is_error() {
        let calc = ProgressCalculator::new();
        let result = calc.compute_input(&input(
            ProjectSource::Horizontal,
            ProjectStatus::VerticalReview,
            None,
            &[50],
        ));
        assert_eq!(result.progress, 0);
        assert_eq!(result.source, ProgressSource::Error);
        assert_eq!(result.kind, ProgressKind::Unknown);
    }

    #[test]
    fn test_vertical_legacy_status_for_display() {
        let calc = ProgressCalculator::new();
        let result = calc.compute_input(&input(
            ProjectSource::Vertical,
            ProjectStatus::QuotationSubmitted,
            None,
            &[],
        ));
        assert_eq!(result.progress, 50);
        assert_eq!(result.source, ProgressSource::Status);
        let detail = result.detail.expect("旧状态应记录在 detail");
        assert_eq!(detail["legacy_status"], "quotation_submitted");
    }
}
