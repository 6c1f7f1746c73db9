// ==========================================
// 项目进度管理系统 - API 层
// ==========================================
// 职责: 对外提供业务操作，组合仓储与引擎
// ==========================================

pub mod error;
pub mod module_api;
pub mod project_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use module_api::{ModuleApi, ModuleChange};
pub use project_api::{
    DepartmentOverview, ProjectApi, ProjectSummary, ProjectView, StatusCount,
};
