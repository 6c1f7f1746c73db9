// ==========================================
// 项目进度管理系统 - 阶段表 / 区间表
// ==========================================
// 职责: 生命周期阶段 → 阶段序号、标签、进度区间或固定进度
// 红线: 不可变、穷举匹配；区间首尾相接在编译期校验
// ==========================================
// 横向前期阶段（可手动设置进度）:
//   初步接触 [0,5]  提交方案 [5,15]  提交报价 [15,20]
//   用户确认 [20,25]  合同签订 [25,35]
// 横向交付阶段（模块映射）:
//   项目实施 [35,85]  项目验收 [85,90]  维保期内 [90,100]
// 终态: 维保期外 100，不再跟进 0
// 纵向: 申报 25，审核 50，通过 100，未通过 0
// ==========================================

use crate::domain::progress::ProgressLimits;
use crate::domain::types::{
    DeliveryStage, FrontStage, ProjectSource, ProjectStatus, StatusPhase, TerminalStage,
    VerticalStage,
};
use crate::i18n;
use serde::{Deserialize, Serialize};

// ==========================================
// ProgressRange - 进度区间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRange {
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl ProgressRange {
    pub const fn new(min: i32, max: i32, default: i32) -> Self {
        Self { min, max, default }
    }

    /// 闭区间包含判断
    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }

    /// 将模块平均进度映射到区间
    ///
    /// progress = round(min + mean/100 * (max - min))
    ///
    /// 整数运算实现四舍五入（均为非负数），避免浮点误差；
    /// mean=0 → min，mean=100 → max，单调不减。
    pub fn interpolate(&self, mean: i32) -> i32 {
        let mean = mean.clamp(0, 100);
        self.min + (mean * (self.max - self.min) + 50) / 100
    }
}

// ==========================================
// 区间数据（穷举）
// ==========================================

/// 前期阶段区间
pub const fn front_range(stage: FrontStage) -> ProgressRange {
    match stage {
        FrontStage::InitialContact => ProgressRange::new(0, 5, 5),
        FrontStage::ProposalSubmitted => ProgressRange::new(5, 15, 15),
        FrontStage::QuotationSubmitted => ProgressRange::new(15, 20, 20),
        FrontStage::UserConfirmation => ProgressRange::new(20, 25, 25),
        FrontStage::ContractSigned => ProgressRange::new(25, 35, 35),
    }
}

/// 交付阶段区间（default 为无模块时的中值）
pub const fn delivery_range(stage: DeliveryStage) -> ProgressRange {
    match stage {
        DeliveryStage::Implementation => ProgressRange::new(35, 85, 60),
        DeliveryStage::Acceptance => ProgressRange::new(85, 90, 88),
        DeliveryStage::Warranty => ProgressRange::new(90, 100, 95),
    }
}

/// 横向终态固定进度
pub const fn terminal_value(stage: TerminalStage) -> i32 {
    match stage {
        TerminalStage::PostWarranty => 100,
        TerminalStage::NoFollowUp => 0,
    }
}

/// 纵向状态固定进度
pub const fn vertical_value(stage: VerticalStage) -> i32 {
    match stage {
        VerticalStage::Declaration => 25,
        VerticalStage::Review => 50,
        VerticalStage::Approved => 100,
        VerticalStage::Rejected => 0,
    }
}

const DELIVERY_ORDER: [DeliveryStage; 3] = [
    DeliveryStage::Implementation,
    DeliveryStage::Acceptance,
    DeliveryStage::Warranty,
];

/// 校验横向区间链: 前期 → 交付，相邻 max == 下一段 min，default 落在区间内
const fn horizontal_ranges_are_contiguous() -> bool {
    let mut prev_max = 0;
    let mut i = 0;
    while i < FrontStage::ALL.len() {
        let r = front_range(FrontStage::ALL[i]);
        if r.min != prev_max || r.min > r.default || r.default > r.max {
            return false;
        }
        prev_max = r.max;
        i += 1;
    }
    let mut j = 0;
    while j < DELIVERY_ORDER.len() {
        let r = delivery_range(DELIVERY_ORDER[j]);
        if r.min != prev_max || r.min > r.default || r.default > r.max {
            return false;
        }
        prev_max = r.max;
        j += 1;
    }
    prev_max == 100
}

const _: () = assert!(
    horizontal_ranges_are_contiguous(),
    "横向阶段进度区间必须首尾相接且默认值落在区间内"
);

// ==========================================
// StageRule - 阶段的进度规则
// ==========================================
// 仅 Front 变体携带可手动设置的区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRule {
    /// 前期阶段: 模块 > 手动 > 默认
    Front(ProgressRange),
    /// 交付阶段: 模块映射，否则区间默认值
    Mapped(ProgressRange),
    /// 横向终态固定值
    Terminal(i32),
    /// 纵向状态固定值
    Vertical(i32),
}

impl StageRule {
    /// 可手动设置的区间（仅前期阶段）
    pub fn manual_range(&self) -> Option<ProgressRange> {
        match self {
            StageRule::Front(range) => Some(*range),
            StageRule::Mapped(_) | StageRule::Terminal(_) | StageRule::Vertical(_) => None,
        }
    }

    /// 进度限制 (min, max, default)
    pub fn bounds(&self) -> ProgressRange {
        match self {
            StageRule::Front(range) | StageRule::Mapped(range) => *range,
            StageRule::Terminal(value) | StageRule::Vertical(value) => {
                ProgressRange::new(*value, *value, *value)
            }
        }
    }
}

// ==========================================
// StageEntry - 查表结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEntry {
    /// 实际用于计算/展示的状态（旧版纵向数据会被映射）
    pub status: ProjectStatus,
    /// 阶段序号（终止类为 0）
    pub stage: i32,
    pub rule: StageRule,
    /// 纵向项目上残留的横向旧状态
    pub legacy_status: Option<ProjectStatus>,
}

impl StageEntry {
    /// 本地化标签
    pub fn label(&self) -> String {
        i18n::t(&self.status.label_key())
    }
}

// ==========================================
// StageTable - 阶段查表
// ==========================================
pub struct StageTable;

impl StageTable {
    /// 查找 (来源, 状态) 对应的阶段
    ///
    /// # 返回
    /// - Some(StageEntry): 表中存在
    /// - None: 组合不在任何表中（例如横向项目挂了纵向状态）
    pub fn lookup(source: ProjectSource, status: ProjectStatus) -> Option<StageEntry> {
        match (source, status.phase()) {
            (ProjectSource::Vertical, StatusPhase::Vertical(stage)) => {
                Some(Self::vertical_entry(stage, None))
            }
            (ProjectSource::Vertical, _) => {
                let stage = Self::legacy_vertical_equivalent(status)?;
                Some(Self::vertical_entry(stage, Some(status)))
            }
            (_, StatusPhase::Vertical(_)) => None,
            (_, StatusPhase::Front(stage)) => Some(StageEntry {
                status,
                stage: Self::stage_number(status),
                rule: StageRule::Front(front_range(stage)),
                legacy_status: None,
            }),
            (_, StatusPhase::Delivery(stage)) => Some(StageEntry {
                status,
                stage: Self::stage_number(status),
                rule: StageRule::Mapped(delivery_range(stage)),
                legacy_status: None,
            }),
            (_, StatusPhase::Terminal(stage)) => Some(StageEntry {
                status,
                stage: Self::stage_number(status),
                rule: StageRule::Terminal(terminal_value(stage)),
                legacy_status: None,
            }),
        }
    }

    /// 阶段序号
    ///
    /// 横向: 前期 1-5，实施 6，验收 7，维保期内 8，维保期外 9，不再跟进 0
    /// 纵向: 申报 1，审核 2，通过 3，未通过 0
    pub fn stage_number(status: ProjectStatus) -> i32 {
        use ProjectStatus::*;
        match status {
            InitialContact => 1,
            ProposalSubmitted => 2,
            QuotationSubmitted => 3,
            UserConfirmation => 4,
            ContractSigned => 5,
            ProjectImplementation => 6,
            ProjectAcceptance => 7,
            WarrantyPeriod => 8,
            PostWarranty => 9,
            NoFollowUp => 0,
            VerticalDeclaration => 1,
            VerticalReview => 2,
            VerticalApproved => 3,
            VerticalRejected => 0,
        }
    }

    /// 旧版兼容表: 纵向项目上残留的横向状态 → 最接近的纵向状态（仅用于展示）
    pub fn legacy_vertical_equivalent(status: ProjectStatus) -> Option<VerticalStage> {
        use ProjectStatus::*;
        match status {
            InitialContact | ProposalSubmitted => Some(VerticalStage::Declaration),
            QuotationSubmitted | UserConfirmation => Some(VerticalStage::Review),
            ContractSigned | ProjectImplementation | ProjectAcceptance | WarrantyPeriod
            | PostWarranty => Some(VerticalStage::Approved),
            NoFollowUp => Some(VerticalStage::Rejected),
            VerticalDeclaration | VerticalReview | VerticalApproved | VerticalRejected => None,
        }
    }

    /// 前期阶段及其区间（按生命周期顺序）
    pub fn front_stages() -> impl Iterator<Item = (FrontStage, ProgressRange)> {
        FrontStage::ALL
            .into_iter()
            .map(|stage| (stage, front_range(stage)))
    }

    /// 查询进度限制（供前端滑块与校验提示）
    pub fn progress_limits(source: ProjectSource, status: ProjectStatus) -> Option<ProgressLimits> {
        let entry = Self::lookup(source, status)?;
        let bounds = entry.rule.bounds();
        // 手动进度仅限横向项目的前期阶段
        let manual_allowed =
            source == ProjectSource::Horizontal && entry.rule.manual_range().is_some();
        Some(ProgressLimits {
            min: bounds.min,
            max: bounds.max,
            default: bounds.default,
            stage: entry.stage,
            label: entry.label(),
            manual_allowed,
        })
    }

    fn vertical_entry(stage: VerticalStage, legacy_status: Option<ProjectStatus>) -> StageEntry {
        let status = stage.status();
        StageEntry {
            status,
            stage: Self::stage_number(status),
            rule: StageRule::Vertical(vertical_value(stage)),
            legacy_status,
        }
    }
}
