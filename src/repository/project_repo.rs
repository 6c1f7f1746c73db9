// ==========================================
// 项目进度管理系统 - 项目仓储
// ==========================================
// 表: projects
// 红线: Repository 不含业务逻辑；状态流转与进度规则由引擎层决定
// 并发: 所有写入带 revision 乐观锁；进度同步在 BEGIN IMMEDIATE 事务内完成
// ==========================================

use crate::domain::project::{Project, ProjectFilter};
use crate::domain::record::ProgressRecord;
use crate::domain::types::{ProjectSource, ProjectStatus, UnknownCodeError};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::module_repo::module_progresses;
use crate::repository::progress_record_repo::insert_progress_record;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const PROJECT_COLUMNS: &str = "id, name, description, partner, amount, status, project_source, \
     progress, manual_progress, start_date, end_date, actual_end_date, revision, \
     created_at, updated_at";

/// 读取枚举编码列；无法识别的编码作为转换错误上抛
pub(crate) fn column_code<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownCodeError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FMT).to_string())
}

/// 进度写回内容（由引擎决策后交给仓储持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressWrite {
    pub progress: i32,
    pub status: ProjectStatus,
    pub actual_end_date: Option<NaiveDate>, // None 表示保持原值
}

// ==========================================
// ProjectRepository - 项目仓储
// ==========================================
pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    /// 创建新的 ProjectRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建项目
    ///
    /// # 返回
    /// - 新项目 id
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &self,
        name: &str,
        description: Option<&str>,
        project_source: ProjectSource,
        status: ProjectStatus,
        partner: Option<&str>,
        amount: Option<f64>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = now.format(DATETIME_FMT).to_string();

        conn.execute(
            r#"INSERT INTO projects (
                name, description, status, project_source, progress, manual_progress,
                partner, amount, start_date, end_date, actual_end_date, revision,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, NULL, ?, ?, ?, ?, NULL, 0, ?, ?)"#,
            params![
                name,
                description,
                status.to_db_str(),
                project_source.to_db_str(),
                partner,
                amount,
                format_date(start_date),
                format_date(end_date),
                &now,
                &now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 按 id 查询项目
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        load_project(&conn, id)
    }

    /// 按 id 查询项目（不存在时返回 NotFound）
    pub fn get(&self, id: i64) -> RepositoryResult<Project> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("Project", id))
    }

    /// 按条件查询项目（最近更新在前）
    pub fn list(&self, filter: &ProjectFilter) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;

        let mut sql = format!("SELECT {} FROM projects WHERE 1 = 1", PROJECT_COLUMNS);
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(status.to_db_str().to_string());
        }
        if let Some(source) = filter.project_source {
            sql.push_str(" AND project_source = ?");
            args.push(source.to_db_str().to_string());
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (name LIKE ? OR IFNULL(description, '') LIKE ?)");
            let pattern = format!("%{}%", search);
            args.push(pattern.clone());
            args.push(pattern);
        }
        sql.push_str(" ORDER BY updated_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let projects = stmt
            .query_map(params_from_iter(args.iter()), map_project)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    /// 写回项目基本信息 (带乐观锁检查)
    ///
    /// # 参数
    /// - project: 已合并修改的项目；以其 revision 作为期望版本
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: 项目不存在
    pub fn update_info(&self, project: &Project, now: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE projects
               SET name = ?, description = ?, partner = ?, amount = ?,
                   start_date = ?, end_date = ?,
                   revision = revision + 1, updated_at = ?
               WHERE id = ? AND revision = ?"#,
            params![
                &project.name,
                &project.description,
                &project.partner,
                project.amount,
                format_date(project.start_date),
                format_date(project.end_date),
                now.format(DATETIME_FMT).to_string(),
                project.id,
                project.revision,
            ],
        )?;

        if rows == 0 {
            return Err(revision_conflict(&conn, project.id, project.revision));
        }
        Ok(())
    }

    /// 更新状态与缓存进度 (带乐观锁检查)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: 项目不存在
    pub fn update_status(
        &self,
        id: i64,
        expected_revision: i32,
        status: ProjectStatus,
        progress: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE projects
               SET status = ?, progress = ?, revision = revision + 1, updated_at = ?
               WHERE id = ? AND revision = ?"#,
            params![
                status.to_db_str(),
                progress,
                now.format(DATETIME_FMT).to_string(),
                id,
                expected_revision,
            ],
        )?;

        if rows == 0 {
            return Err(revision_conflict(&conn, id, expected_revision));
        }
        Ok(())
    }

    /// 写入手动进度 (带乐观锁检查)
    pub fn update_manual_progress(
        &self,
        id: i64,
        expected_revision: i32,
        manual_progress: Option<i32>,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE projects
               SET manual_progress = ?, revision = revision + 1, updated_at = ?
               WHERE id = ? AND revision = ?"#,
            params![
                manual_progress,
                now.format(DATETIME_FMT).to_string(),
                id,
                expected_revision,
            ],
        )?;

        if rows == 0 {
            return Err(revision_conflict(&conn, id, expected_revision));
        }
        Ok(())
    }

    /// 在单个事务内读取项目与模块进度、决策并写回
    ///
    /// # 参数
    /// - decide: 基于事务内快照做决策；返回 None 表示无需写入
    /// - record: 写入成功时一并追加的进度记录
    ///
    /// # 并发控制
    /// - BEGIN IMMEDIATE 获取写锁，读取与写回观察同一份模块快照
    /// - 写回时校验 revision，防止丢失更新
    pub fn update_progress_atomically<T, F>(
        &self,
        project_id: i64,
        now: NaiveDateTime,
        record: Option<&ProgressRecord>,
        decide: F,
    ) -> RepositoryResult<Option<T>>
    where
        F: FnOnce(&Project, &[i32]) -> Option<(ProgressWrite, T)>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let project = load_project(&tx, project_id)?
            .ok_or_else(|| RepositoryError::not_found("Project", project_id))?;
        let progresses = module_progresses(&tx, project_id)?;

        let Some((write, output)) = decide(&project, &progresses) else {
            // 只读事务，直接结束
            tx.commit()?;
            return Ok(None);
        };

        let rows = tx.execute(
            r#"UPDATE projects
               SET progress = ?, status = ?,
                   actual_end_date = COALESCE(?, actual_end_date),
                   revision = revision + 1, updated_at = ?
               WHERE id = ? AND revision = ?"#,
            params![
                write.progress,
                write.status.to_db_str(),
                format_date(write.actual_end_date),
                now.format(DATETIME_FMT).to_string(),
                project_id,
                project.revision,
            ],
        )?;

        if rows == 0 {
            // 事务随 tx 丢弃回滚
            return Err(revision_conflict(&tx, project_id, project.revision));
        }

        if let Some(record) = record {
            insert_progress_record(&tx, record)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(Some(output))
    }

    /// 删除项目（模块与进度记录级联删除）
    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Project", id));
        }
        Ok(())
    }
}

/// 读取单个项目
pub(crate) fn load_project(conn: &Connection, id: i64) -> RepositoryResult<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
    let project = conn
        .query_row(&sql, params![id], map_project)
        .optional()?;
    Ok(project)
}

/// 区分乐观锁冲突与记录不存在
fn revision_conflict(conn: &Connection, id: i64, expected: i32) -> RepositoryError {
    let actual = conn
        .query_row(
            "SELECT revision FROM projects WHERE id = ?",
            params![id],
            |row| row.get::<_, i32>(0),
        )
        .optional();

    match actual {
        Ok(Some(actual)) => RepositoryError::OptimisticLockFailure {
            entity: "Project".to_string(),
            id: id.to_string(),
            expected,
            actual,
        },
        Ok(None) => RepositoryError::not_found("Project", id),
        Err(e) => e.into(),
    }
}

/// 映射数据库行到 Project
fn map_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        partner: row.get(3)?,
        amount: row.get(4)?,
        status: column_code(row, 5)?,
        project_source: column_code(row, 6)?,
        progress: row.get(7)?,
        manual_progress: row.get(8)?,
        start_date: row.get(9)?,
        end_date: row.get(10)?,
        actual_end_date: row.get(11)?,
        revision: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
