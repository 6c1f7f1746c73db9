// ==========================================
// 项目进度管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 装配顺序: 共享连接 → 建表 → Repository → 配置 → API
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ModuleApi, ProjectApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::repository::{
    MemberRepository, ModuleRepository, ProgressRecordRepository, ProjectRepository,
    WorkRecordRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 项目API
    pub project_api: Arc<ProjectApi>,

    /// 模块API
    pub module_api: Arc<ModuleApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)));
        state.db_path = db_path;
        Ok(state)
    }

    /// 基于已有连接装配（连接需已完成建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        if let Ok(guard) = conn.lock() {
            if let Err(e) = configure_sqlite_connection(&guard) {
                tracing::warn!("连接 PRAGMA 配置失败(将继续启动): {}", e);
            }
        }

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let project_repo = Arc::new(ProjectRepository::new(conn.clone()));
        let module_repo = Arc::new(ModuleRepository::new(conn.clone()));
        let record_repo = Arc::new(ProgressRecordRepository::new(conn.clone()));
        let member_repo = Arc::new(MemberRepository::new(conn.clone()));
        let work_record_repo = Arc::new(WorkRecordRepository::new(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let project_api = Arc::new(ProjectApi::new(
            project_repo.clone(),
            module_repo.clone(),
            record_repo.clone(),
            member_repo.clone(),
            config_manager.clone(),
        ));
        let module_api = Arc::new(ModuleApi::new(
            module_repo,
            project_repo,
            record_repo,
            member_repo,
            work_record_repo,
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Self {
            db_path: String::new(),
            project_api,
            module_api,
            config_manager,
        }
    }

    /// 应用配置中的语言设置
    pub fn apply_locale(&self, override_locale: Option<&str>) {
        let locale = match override_locale {
            Some(locale) => locale.to_string(),
            None => match self.config_manager.get_locale() {
                Ok(locale) => locale,
                Err(e) => {
                    tracing::warn!("读取语言配置失败，使用默认语言: {}", e);
                    return;
                }
            },
        };
        crate::i18n::set_locale(&locale);
    }
}

/// 获取默认数据库路径
///
/// 优先级: DATABASE_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(crate::config::config_manager::DATABASE_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./project_progress.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("project-progress");
        // 确保目录存在
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("project_progress.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_wires_apis() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let state = AppState::from_connection(Arc::new(Mutex::new(conn)));

        let overview = state.project_api.department_overview().unwrap();
        assert_eq!(overview.total_projects, 0);
        assert_eq!(overview.average_progress, 0.0);
    }
}
