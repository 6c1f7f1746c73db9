// ==========================================
// 项目进度管理系统 - 模块仓储
// ==========================================
// 表: project_modules
// 红线: 进度/状态一致性由引擎层 module_state 协调，仓储只负责读写
// ==========================================

use crate::domain::module::ProjectModule;
use crate::domain::record::ModuleProgressRecord;
use crate::domain::types::ModuleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::progress_record_repo::insert_module_progress_record;
use crate::repository::project_repo::{column_code, format_date, DATETIME_FMT};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const MODULE_COLUMNS: &str = "id, project_id, name, description, progress, status, priority, \
     start_date, end_date, created_at, updated_at";

/// 读取项目全部模块进度（供事务内汇总使用）
pub(crate) fn module_progresses(conn: &Connection, project_id: i64) -> RepositoryResult<Vec<i32>> {
    let mut stmt =
        conn.prepare("SELECT progress FROM project_modules WHERE project_id = ? ORDER BY id")?;
    let progresses = stmt
        .query_map(params![project_id], |row| row.get::<_, i32>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(progresses)
}

/// 新模块行
#[derive(Debug, Clone)]
pub struct ModuleInsert<'a> {
    pub project_id: i64,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub progress: i32,
    pub status: ModuleStatus,
    pub priority: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ==========================================
// ModuleRepository - 模块仓储
// ==========================================
pub struct ModuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ModuleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建模块
    ///
    /// # 错误
    /// - `RepositoryError::ForeignKeyViolation`: 项目不存在
    pub fn insert(&self, module: &ModuleInsert<'_>, now: NaiveDateTime) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = now.format(DATETIME_FMT).to_string();

        conn.execute(
            r#"INSERT INTO project_modules (
                project_id, name, description, progress, status, priority,
                start_date, end_date, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                module.project_id,
                module.name,
                module.description,
                module.progress,
                module.status.to_db_str(),
                module.priority,
                format_date(module.start_date),
                format_date(module.end_date),
                &now,
                &now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 按 id 查询模块
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ProjectModule>> {
        let conn = self.get_conn()?;
        load_module(&conn, id)
    }

    /// 按 id 查询模块（不存在时返回 NotFound）
    pub fn get(&self, id: i64) -> RepositoryResult<ProjectModule> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("ProjectModule", id))
    }

    /// 查询项目的所有模块（优先级高的在前，其次按创建顺序）
    pub fn list_by_project(&self, project_id: i64) -> RepositoryResult<Vec<ProjectModule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM project_modules WHERE project_id = ? \
             ORDER BY priority DESC, created_at, id",
            MODULE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let modules = stmt
            .query_map(params![project_id], map_module)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(modules)
    }

    /// 查询全部模块（部门总览使用）
    pub fn list_all(&self) -> RepositoryResult<Vec<ProjectModule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM project_modules ORDER BY project_id, priority DESC, created_at, id",
            MODULE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let modules = stmt
            .query_map([], map_module)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(modules)
    }

    /// 在单个事务内读取模块、修改并写回
    ///
    /// # 参数
    /// - apply: 基于事务内快照修改模块；返回错误时整个事务回滚
    ///
    /// # 返回
    /// - (修改前, 修改后)
    ///
    /// # 并发控制
    /// - BEGIN IMMEDIATE 获取写锁，并发的进度写入不会被旧快照覆盖
    pub fn update_with<F, E>(
        &self,
        id: i64,
        now: NaiveDateTime,
        apply: F,
    ) -> Result<(ProjectModule, ProjectModule), E>
    where
        F: FnOnce(&mut ProjectModule) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let before = load_module(&tx, id)?
            .ok_or_else(|| RepositoryError::not_found("ProjectModule", id))?;
        let mut module = before.clone();
        apply(&mut module)?;

        tx.execute(
            r#"UPDATE project_modules
               SET name = ?, description = ?, progress = ?, status = ?, priority = ?,
                   start_date = ?, end_date = ?, updated_at = ?
               WHERE id = ?"#,
            params![
                &module.name,
                &module.description,
                module.progress,
                module.status.to_db_str(),
                module.priority,
                format_date(module.start_date),
                format_date(module.end_date),
                now.format(DATETIME_FMT).to_string(),
                id,
            ],
        )
        .map_err(RepositoryError::from)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        module.updated_at = now;
        Ok((before, module))
    }

    /// 更新模块进度并追加进度记录（同一事务）
    pub fn update_progress(
        &self,
        id: i64,
        progress: i32,
        status: ModuleStatus,
        record: &ModuleProgressRecord,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            r#"UPDATE project_modules
               SET progress = ?, status = ?, updated_at = ?
               WHERE id = ?"#,
            params![
                progress,
                status.to_db_str(),
                now.format(DATETIME_FMT).to_string(),
                id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("ProjectModule", id));
        }

        insert_module_progress_record(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// 删除模块
    ///
    /// # 返回
    /// - 模块所属项目 id（用于触发进度同步）
    pub fn delete(&self, id: i64) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let project_id: Option<i64> = tx
            .query_row(
                "SELECT project_id FROM project_modules WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let project_id = project_id.ok_or_else(|| RepositoryError::not_found("ProjectModule", id))?;

        tx.execute("DELETE FROM project_modules WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(project_id)
    }
}

/// 读取单个模块
fn load_module(conn: &Connection, id: i64) -> RepositoryResult<Option<ProjectModule>> {
    let sql = format!("SELECT {} FROM project_modules WHERE id = ?", MODULE_COLUMNS);
    let module = conn.query_row(&sql, params![id], map_module).optional()?;
    Ok(module)
}

/// 映射数据库行到 ProjectModule
fn map_module(row: &rusqlite::Row) -> rusqlite::Result<ProjectModule> {
    Ok(ProjectModule {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        progress: row.get(4)?,
        status: column_code(row, 5)?,
        priority: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
