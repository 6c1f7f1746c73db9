// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};

use project_progress::api::{ApiError, ModuleApi, ProjectApi, ProjectView};
use project_progress::app::AppState;
use project_progress::config::ConfigManager;
use project_progress::domain::{NewModule, NewProject, ProjectModule};
use project_progress::domain::types::{ModuleStatus, ProjectSource};
use project_progress::repository::{ModuleRepository, ProjectRepository};
use tempfile::NamedTempFile;

#[allow(unused_imports)]
pub use test_helpers::{create_test_db, insert_test_config, open_test_connection};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 所有 API 与仓储共享同一个连接
pub struct ApiTestEnv {
    pub db_path: String,
    pub project_api: Arc<ProjectApi>,
    pub module_api: Arc<ModuleApi>,
    pub config_manager: Arc<ConfigManager>,

    // Repository层（用于直接读取缓存列）
    pub project_repo: Arc<ProjectRepository>,
    pub module_repo: Arc<ModuleRepository>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    ///
    /// # 说明
    /// - 使用临时数据库文件
    /// - 通过 AppState 装配，与运行时一致
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) = create_test_db().map_err(|e| e.to_string())?;
        let conn = open_test_connection(&db_path).map_err(|e| e.to_string())?;
        let conn = Arc::new(Mutex::new(conn));

        let state = AppState::from_connection(conn.clone());

        Ok(Self {
            db_path,
            project_api: state.project_api,
            module_api: state.module_api,
            config_manager: state.config_manager,
            project_repo: Arc::new(ProjectRepository::new(conn.clone())),
            module_repo: Arc::new(ModuleRepository::new(conn)),
            _temp_file: temp_file,
        })
    }

    /// 在同一数据库文件上打开一套独立连接的应用状态
    pub fn open_second_state(&self) -> Result<AppState, String> {
        AppState::new(self.db_path.clone())
    }

    /// 创建项目
    pub fn create_project(&self, name: &str, source: ProjectSource) -> ProjectView {
        self.project_api
            .create_project(&NewProject {
                name: name.to_string(),
                project_source: Some(source),
                ..Default::default()
            })
            .expect("创建项目失败")
    }

    /// 创建项目并推进到指定状态
    pub fn create_project_at(&self, name: &str, source: ProjectSource, status: &str) -> i64 {
        let view = self.create_project(name, source);
        let id = view.project.id;
        if view.project.status.to_db_str() != status {
            self.project_api
                .update_status(id, status)
                .expect("推进项目状态失败");
        }
        id
    }

    /// 创建模块（状态由进度推断）
    pub fn add_module(&self, project_id: i64, name: &str, progress: i32) -> ProjectModule {
        self.module_api
            .create_module(
                project_id,
                &NewModule {
                    name: name.to_string(),
                    progress: Some(progress),
                    ..Default::default()
                },
            )
            .expect("创建模块失败")
            .module
            .expect("创建结果应包含模块")
    }

    /// 创建指定状态的模块
    pub fn add_module_with_status(
        &self,
        project_id: i64,
        name: &str,
        progress: i32,
        status: ModuleStatus,
    ) -> ProjectModule {
        self.module_api
            .create_module(
                project_id,
                &NewModule {
                    name: name.to_string(),
                    progress: Some(progress),
                    status: Some(status),
                    ..Default::default()
                },
            )
            .expect("创建模块失败")
            .module
            .expect("创建结果应包含模块")
    }

    /// 读取项目缓存进度列
    pub fn cached_progress(&self, project_id: i64) -> i32 {
        self.project_repo.get(project_id).expect("项目应存在").progress
    }
}

// ==========================================
// 错误断言
// ==========================================

/// 验证是否为无效输入错误
pub fn assert_invalid_input(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::InvalidInput(_)) => {
            // 预期的错误类型
        }
        Ok(val) => panic!("预期InvalidInput错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期InvalidInput错误，但得到: {:?}", e),
    }
}

/// 验证是否为手动进度状态错误
pub fn assert_invalid_state(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::InvalidState(_)) => {}
        Ok(val) => panic!("预期InvalidState错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期InvalidState错误，但得到: {:?}", e),
    }
}

/// 验证是否为非法状态转换
pub fn assert_invalid_transition(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::InvalidStateTransition { .. }) => {}
        Ok(val) => panic!("预期InvalidStateTransition错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期InvalidStateTransition错误，但得到: {:?}", e),
    }
}

/// 验证是否为资源不存在
pub fn assert_not_found(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::NotFound(_)) => {}
        Ok(val) => panic!("预期NotFound错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期NotFound错误，但得到: {:?}", e),
    }
}
