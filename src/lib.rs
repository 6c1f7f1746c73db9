// ==========================================
// 项目进度管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 核心: 进度与生命周期计算引擎
//   阶段表/区间表 → 模块汇总 → 进度计算 → 手动进度校验 → 生命周期同步
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 进度规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MemberRole, ModuleStatus, ProjectSource, ProjectStatus};

// 领域实体
pub use domain::{
    MemberInput, ModuleProgressRecord, ModuleWorkRecord, NewModule, NewProject, NewWorkRecord,
    ProgressRecord, ProgressResult, ProgressSource, Project, ProjectMember, ProjectModule,
};

// 引擎
pub use engine::{
    LifecycleSync, ManualOverrideValidator, ManualProgressError, ModuleAggregator,
    ProgressCalculator, StageTable,
};

// API
pub use api::{ApiError, ApiResult, ModuleApi, ProjectApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "项目进度管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
