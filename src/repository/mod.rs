// ==========================================
// 项目进度管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod member_repo;
pub mod module_repo;
pub mod progress_record_repo;
pub mod project_repo;
pub mod work_record_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use member_repo::MemberRepository;
pub use module_repo::{ModuleInsert, ModuleRepository};
pub use progress_record_repo::ProgressRecordRepository;
pub use project_repo::{ProgressWrite, ProjectRepository};
pub use work_record_repo::{WorkRecordRepository, WorkRecordWrite};
