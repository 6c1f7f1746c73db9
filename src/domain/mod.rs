// ==========================================
// 项目进度管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、封闭枚举、计算结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod member;
pub mod module;
pub mod progress;
pub mod project;
pub mod record;
pub mod types;
pub mod work_record;

use serde::{Deserialize, Deserializer};

// 重导出核心类型
pub use member::{MemberInput, ModuleAssignment, ProjectMember};
pub use module::{ModuleStats, ModuleUpdate, NewModule, ProjectModule};
pub use progress::{ProgressKind, ProgressLimits, ProgressResult, ProgressSource};
pub use project::{NewProject, Project, ProjectFilter, ProjectInfoUpdate};
pub use record::{ModuleProgressRecord, ProgressRecord};
pub use types::{
    DeliveryStage, FrontStage, MemberRole, ModuleStatus, ProjectSource, ProjectStatus,
    StatusPhase, TerminalStage, UnknownCodeError, VerticalStage,
};
pub use work_record::{ModuleWorkRecord, NewWorkRecord, WorkRecordUpdate};

/// 可清空字段的反序列化
///
/// 字段缺失 → None（保持原值）；显式 null → Some(None)（清空）；有值 → Some(Some(v))
pub fn deserialize_patch<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

