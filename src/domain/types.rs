// ==========================================
// 项目进度管理系统 - 领域类型定义
// ==========================================
// 红线: 状态是封闭枚举，按阶段分类穷举匹配，不做字符串分派
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 无法识别的枚举编码（来自上游或数据库的字符串）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无法识别的{kind}: {value}")]
pub struct UnknownCodeError {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownCodeError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ==========================================
// 项目来源 (Project Source)
// ==========================================
// 决定适用哪套进度规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSource {
    Horizontal,    // 横向项目
    Vertical,      // 纵向项目（仅按状态计算进度）
    SelfDeveloped, // 自研项目
}

impl ProjectSource {
    pub const ALL: [ProjectSource; 3] = [
        ProjectSource::Horizontal,
        ProjectSource::Vertical,
        ProjectSource::SelfDeveloped,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProjectSource::Horizontal => "horizontal",
            ProjectSource::Vertical => "vertical",
            ProjectSource::SelfDeveloped => "self_developed",
        }
    }

    /// 新建项目的初始状态（生命周期第一阶段）
    pub fn initial_status(&self) -> ProjectStatus {
        match self {
            ProjectSource::Vertical => ProjectStatus::VerticalDeclaration,
            ProjectSource::Horizontal | ProjectSource::SelfDeveloped => {
                ProjectStatus::InitialContact
            }
        }
    }

    /// 该来源是否使用纵向状态族
    pub fn uses_vertical_statuses(&self) -> bool {
        matches!(self, ProjectSource::Vertical)
    }
}

impl fmt::Display for ProjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl FromStr for ProjectSource {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectSource::ALL
            .into_iter()
            .find(|source| source.to_db_str() == s.trim())
            .ok_or_else(|| UnknownCodeError::new("项目来源", s))
    }
}

// ==========================================
// 项目状态 (Project Status)
// ==========================================
// 横向/自研: 初步接触 → … → 维保期外 / 不再跟进
// 纵向: 申报 → 审核 → 通过 / 未通过
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    InitialContact,        // 初步接触
    ProposalSubmitted,     // 提交方案
    QuotationSubmitted,    // 提交报价
    UserConfirmation,      // 用户确认
    ContractSigned,        // 合同签订
    ProjectImplementation, // 项目实施
    ProjectAcceptance,     // 项目验收
    WarrantyPeriod,        // 维保期内
    PostWarranty,          // 维保期外
    NoFollowUp,            // 不再跟进
    VerticalDeclaration,   // 申报阶段
    VerticalReview,        // 审核阶段
    VerticalApproved,      // 审核通过
    VerticalRejected,      // 审核未通过
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 14] = [
        ProjectStatus::InitialContact,
        ProjectStatus::ProposalSubmitted,
        ProjectStatus::QuotationSubmitted,
        ProjectStatus::UserConfirmation,
        ProjectStatus::ContractSigned,
        ProjectStatus::ProjectImplementation,
        ProjectStatus::ProjectAcceptance,
        ProjectStatus::WarrantyPeriod,
        ProjectStatus::PostWarranty,
        ProjectStatus::NoFollowUp,
        ProjectStatus::VerticalDeclaration,
        ProjectStatus::VerticalReview,
        ProjectStatus::VerticalApproved,
        ProjectStatus::VerticalRejected,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProjectStatus::InitialContact => "initial_contact",
            ProjectStatus::ProposalSubmitted => "proposal_submitted",
            ProjectStatus::QuotationSubmitted => "quotation_submitted",
            ProjectStatus::UserConfirmation => "user_confirmation",
            ProjectStatus::ContractSigned => "contract_signed",
            ProjectStatus::ProjectImplementation => "project_implementation",
            ProjectStatus::ProjectAcceptance => "project_acceptance",
            ProjectStatus::WarrantyPeriod => "warranty_period",
            ProjectStatus::PostWarranty => "post_warranty",
            ProjectStatus::NoFollowUp => "no_follow_up",
            ProjectStatus::VerticalDeclaration => "vertical_declaration",
            ProjectStatus::VerticalReview => "vertical_review",
            ProjectStatus::VerticalApproved => "vertical_approved",
            ProjectStatus::VerticalRejected => "vertical_rejected",
        }
    }

    /// i18n 标签键
    pub fn label_key(&self) -> String {
        format!("status.{}", self.to_db_str())
    }

    /// 阶段分类（穷举）
    pub fn phase(&self) -> StatusPhase {
        use ProjectStatus::*;
        match self {
            InitialContact => StatusPhase::Front(FrontStage::InitialContact),
            ProposalSubmitted => StatusPhase::Front(FrontStage::ProposalSubmitted),
            QuotationSubmitted => StatusPhase::Front(FrontStage::QuotationSubmitted),
            UserConfirmation => StatusPhase::Front(FrontStage::UserConfirmation),
            ContractSigned => StatusPhase::Front(FrontStage::ContractSigned),
            ProjectImplementation => StatusPhase::Delivery(DeliveryStage::Implementation),
            ProjectAcceptance => StatusPhase::Delivery(DeliveryStage::Acceptance),
            WarrantyPeriod => StatusPhase::Delivery(DeliveryStage::Warranty),
            PostWarranty => StatusPhase::Terminal(TerminalStage::PostWarranty),
            NoFollowUp => StatusPhase::Terminal(TerminalStage::NoFollowUp),
            VerticalDeclaration => StatusPhase::Vertical(VerticalStage::Declaration),
            VerticalReview => StatusPhase::Vertical(VerticalStage::Review),
            VerticalApproved => StatusPhase::Vertical(VerticalStage::Approved),
            VerticalRejected => StatusPhase::Vertical(VerticalStage::Rejected),
        }
    }

    /// 是否属于纵向状态族
    pub fn is_vertical_family(&self) -> bool {
        matches!(self.phase(), StatusPhase::Vertical(_))
    }

    /// 是否为终态（进度固定，不再流转）
    pub fn is_terminal(&self) -> bool {
        match self.phase() {
            StatusPhase::Terminal(_) => true,
            StatusPhase::Vertical(stage) => stage.is_terminal(),
            StatusPhase::Front(_) | StatusPhase::Delivery(_) => false,
        }
    }

    /// 是否为中止类终态（不再跟进 / 审核未通过）
    pub fn is_termination(&self) -> bool {
        matches!(
            self,
            ProjectStatus::NoFollowUp | ProjectStatus::VerticalRejected
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.to_db_str() == s.trim())
            .ok_or_else(|| UnknownCodeError::new("项目状态", s))
    }
}

// ==========================================
// 阶段分类 (Status Phase)
// ==========================================
// 前期阶段才具备手动进度能力；该能力由变体决定，而非列表成员判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Front(FrontStage),       // 前期阶段（可手动设置进度）
    Delivery(DeliveryStage), // 实施/验收/维保（模块映射）
    Terminal(TerminalStage), // 横向终态
    Vertical(VerticalStage), // 纵向状态
}

/// 前期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontStage {
    InitialContact,
    ProposalSubmitted,
    QuotationSubmitted,
    UserConfirmation,
    ContractSigned,
}

impl FrontStage {
    /// 按生命周期顺序排列
    pub const ALL: [FrontStage; 5] = [
        FrontStage::InitialContact,
        FrontStage::ProposalSubmitted,
        FrontStage::QuotationSubmitted,
        FrontStage::UserConfirmation,
        FrontStage::ContractSigned,
    ];

    pub fn status(&self) -> ProjectStatus {
        match self {
            FrontStage::InitialContact => ProjectStatus::InitialContact,
            FrontStage::ProposalSubmitted => ProjectStatus::ProposalSubmitted,
            FrontStage::QuotationSubmitted => ProjectStatus::QuotationSubmitted,
            FrontStage::UserConfirmation => ProjectStatus::UserConfirmation,
            FrontStage::ContractSigned => ProjectStatus::ContractSigned,
        }
    }
}

/// 交付阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryStage {
    Implementation,
    Acceptance,
    Warranty,
}

impl DeliveryStage {
    pub fn status(&self) -> ProjectStatus {
        match self {
            DeliveryStage::Implementation => ProjectStatus::ProjectImplementation,
            DeliveryStage::Acceptance => ProjectStatus::ProjectAcceptance,
            DeliveryStage::Warranty => ProjectStatus::WarrantyPeriod,
        }
    }
}

/// 横向终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalStage {
    PostWarranty,
    NoFollowUp,
}

/// 纵向状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalStage {
    Declaration,
    Review,
    Approved,
    Rejected,
}

impl VerticalStage {
    pub fn status(&self) -> ProjectStatus {
        match self {
            VerticalStage::Declaration => ProjectStatus::VerticalDeclaration,
            VerticalStage::Review => ProjectStatus::VerticalReview,
            VerticalStage::Approved => ProjectStatus::VerticalApproved,
            VerticalStage::Rejected => ProjectStatus::VerticalRejected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VerticalStage::Approved | VerticalStage::Rejected)
    }
}

// ==========================================
// 模块状态 (Module Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    NotStarted, // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
    Paused,     // 暂停
}

impl ModuleStatus {
    pub const ALL: [ModuleStatus; 4] = [
        ModuleStatus::NotStarted,
        ModuleStatus::InProgress,
        ModuleStatus::Completed,
        ModuleStatus::Paused,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ModuleStatus::NotStarted => "not_started",
            ModuleStatus::InProgress => "in_progress",
            ModuleStatus::Completed => "completed",
            ModuleStatus::Paused => "paused",
        }
    }

    /// 由进度推断状态: 0 → 未开始, 100 → 已完成, 其余 → 进行中
    pub fn from_progress(progress: i32) -> Self {
        match progress {
            p if p <= 0 => ModuleStatus::NotStarted,
            p if p >= 100 => ModuleStatus::Completed,
            _ => ModuleStatus::InProgress,
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl FromStr for ModuleStatus {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 兼容旧数据中的大写枚举名（NOT_STARTED 等）
        let normalized = s.trim().to_lowercase();
        ModuleStatus::ALL
            .into_iter()
            .find(|status| status.to_db_str() == normalized)
            .ok_or_else(|| UnknownCodeError::new("模块状态", s))
    }
}

// ==========================================
// 成员角色 (Member Role)
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Leader, // 负责人
    #[default]
    Member, // 成员
}

impl MemberRole {
    pub const ALL: [MemberRole; 2] = [MemberRole::Leader, MemberRole::Member];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MemberRole::Leader => "leader",
            MemberRole::Member => "member",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl FromStr for MemberRole {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        MemberRole::ALL
            .into_iter()
            .find(|role| role.to_db_str() == normalized)
            .ok_or_else(|| UnknownCodeError::new("成员角色", s))
    }
}
