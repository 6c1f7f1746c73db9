// ==========================================
// 项目进度管理系统 - 进度历史仓储
// ==========================================
// 表: progress_records / module_progress_records
// 说明: insert_* 接收 &Connection，可在其他仓储的事务内调用
// ==========================================

use crate::domain::record::{ModuleProgressRecord, ProgressRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 写入项目进度记录
pub(crate) fn insert_progress_record(conn: &Connection, record: &ProgressRecord) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO progress_records (
            record_id, project_id, progress, notes, updated_by, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?)"#,
        params![
            &record.record_id,
            record.project_id,
            record.progress,
            &record.notes,
            &record.updated_by,
            record.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

/// 写入模块进度记录
pub(crate) fn insert_module_progress_record(
    conn: &Connection,
    record: &ModuleProgressRecord,
) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO module_progress_records (
            record_id, module_id, progress, notes, updated_by, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?)"#,
        params![
            &record.record_id,
            record.module_id,
            record.progress,
            &record.notes,
            &record.updated_by,
            record.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

// ==========================================
// ProgressRecordRepository - 进度历史查询
// ==========================================
pub struct ProgressRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 项目进度历史（最新在前）
    pub fn list_for_project(&self, project_id: i64) -> RepositoryResult<Vec<ProgressRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT record_id, project_id, progress, notes, updated_by, updated_at
               FROM progress_records
               WHERE project_id = ?
               ORDER BY updated_at DESC, rowid DESC"#,
        )?;

        let records = stmt
            .query_map(params![project_id], |row| {
                Ok(ProgressRecord {
                    record_id: row.get(0)?,
                    project_id: row.get(1)?,
                    progress: row.get(2)?,
                    notes: row.get(3)?,
                    updated_by: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 模块进度历史（最新在前）
    pub fn list_for_module(&self, module_id: i64) -> RepositoryResult<Vec<ModuleProgressRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT record_id, module_id, progress, notes, updated_by, updated_at
               FROM module_progress_records
               WHERE module_id = ?
               ORDER BY updated_at DESC, rowid DESC"#,
        )?;

        let records = stmt
            .query_map(params![module_id], |row| {
                Ok(ModuleProgressRecord {
                    record_id: row.get(0)?,
                    module_id: row.get(1)?,
                    progress: row.get(2)?,
                    notes: row.get(3)?,
                    updated_by: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
