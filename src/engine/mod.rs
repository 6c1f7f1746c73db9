// ==========================================
// 项目进度管理系统 - 引擎层
// ==========================================
// 职责: 进度计算与生命周期规则（纯逻辑）
// 红线: Engine 不拼 SQL，不持有连接；所有结果必须可解释（source/info）
// ==========================================

pub mod lifecycle_sync;
pub mod manual_override;
pub mod module_aggregator;
pub mod module_state;
pub mod progress_calculator;
pub mod stage_table;

// 重导出核心引擎
pub use lifecycle_sync::{
    LifecycleSync, StatusChangeError, StatusTransition, SyncOutcome, SyncTrigger, TransitionRule,
};
pub use manual_override::{ManualOverrideValidator, ManualProgressError};
pub use module_aggregator::{ModuleAggregate, ModuleAggregator};
pub use module_state::{reconcile as reconcile_module_state, ModuleState};
pub use progress_calculator::{ProgressCalculator, ProgressInput};
pub use stage_table::{ProgressRange, StageEntry, StageRule, StageTable};
