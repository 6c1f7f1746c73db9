// ==========================================
// 项目进度管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id = 'global')
// 说明: 阶段区间表不可配置，只开放开关类与默认值类配置
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::ProjectSource;
use crate::i18n::SUPPORTED_LOCALES;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 数据库路径环境变量
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
/// 语言环境变量（优先于 config_kv 中的 locale）
pub const LOCALE_ENV: &str = "PROJECT_PROGRESS_LOCALE";

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    // ===== 业务配置 =====

    /// 界面语言（zh-CN / en）
    pub fn get_locale(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LOCALE, DEFAULT_LOCALE)?;
        if SUPPORTED_LOCALES.contains(&value.as_str()) {
            Ok(value)
        } else {
            tracing::warn!(locale = %value, "配置中的语言不受支持，使用默认语言");
            Ok(DEFAULT_LOCALE.to_string())
        }
    }

    /// 设置界面语言
    pub fn set_locale(&self, locale: &str) -> Result<(), Box<dyn Error>> {
        if !SUPPORTED_LOCALES.contains(&locale) {
            return Err(format!("不支持的语言: {}", locale).into());
        }
        self.set_global_config_value(config_keys::LOCALE, locale)
    }

    /// 是否启用状态自动流转（默认启用）
    pub fn get_auto_transition_enabled(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::AUTO_TRANSITION_ENABLED, "true")?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => {
                tracing::warn!(value = other, "auto_transition_enabled 配置无法解析，按启用处理");
                Ok(true)
            }
        }
    }

    /// 新建项目未指定来源时使用的默认来源（默认横向）
    pub fn get_default_project_source(&self) -> Result<ProjectSource, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::DEFAULT_PROJECT_SOURCE,
            ProjectSource::Horizontal.to_db_str(),
        )?;
        match value.parse::<ProjectSource>() {
            Ok(source) => Ok(source),
            Err(e) => {
                tracing::warn!(error = %e, "default_project_source 配置无效，使用横向项目");
                Ok(ProjectSource::Horizontal)
            }
        }
    }

    // ===== 快照 =====

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的 global 配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// AppConfig - 启动配置（环境变量）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: String,
    pub locale: Option<String>,
}

impl AppConfig {
    /// 从环境变量读取启动配置
    ///
    /// - DATABASE_PATH: 数据库路径，缺省为用户数据目录
    /// - PROJECT_PROGRESS_LOCALE: 语言，缺省读取 config_kv
    pub fn from_env() -> Self {
        let db_path = crate::app::get_default_db_path();

        let locale = std::env::var(LOCALE_ENV)
            .ok()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Self { db_path, locale }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 界面
    pub const LOCALE: &str = "locale";

    // 生命周期
    pub const AUTO_TRANSITION_ENABLED: &str = "auto_transition_enabled";

    // 项目默认值
    pub const DEFAULT_PROJECT_SOURCE: &str = "default_project_source";
}
