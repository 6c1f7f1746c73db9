// ==========================================
// 项目进度管理系统 - 模块周工作记录仓储
// ==========================================
// 表: module_work_records
// 红线: 重叠检查与写入在同一 BEGIN IMMEDIATE 事务内，避免并发写入两条重叠记录
// ==========================================

use crate::domain::work_record::{ModuleWorkRecord, NewWorkRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::project_repo::{DATETIME_FMT, DATE_FMT};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const WORK_RECORD_COLUMNS: &str = "id, module_id, week_start, week_end, work_content, \
     achievements, issues, next_week_plan, created_by, created_at, updated_at";

/// 写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkRecordWrite {
    /// 已写入（返回写入后的记录）
    Saved(ModuleWorkRecord),
    /// 与已有记录周期重叠，未写入
    Overlaps(ModuleWorkRecord),
}

// ==========================================
// WorkRecordRepository - 周工作记录仓储
// ==========================================
pub struct WorkRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增工作记录（周期与已有记录重叠时不写入）
    ///
    /// # 错误
    /// - `RepositoryError::ForeignKeyViolation`: 模块不存在
    pub fn insert(
        &self,
        module_id: i64,
        record: &NewWorkRecord,
        created_by: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<WorkRecordWrite> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) =
            find_overlap(&tx, module_id, record.week_start, record.week_end, None)?
        {
            return Ok(WorkRecordWrite::Overlaps(existing));
        }

        let now = now.format(DATETIME_FMT).to_string();
        tx.execute(
            r#"INSERT INTO module_work_records (
                module_id, week_start, week_end, work_content, achievements, issues,
                next_week_plan, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                module_id,
                record.week_start.format(DATE_FMT).to_string(),
                record.week_end.format(DATE_FMT).to_string(),
                &record.work_content,
                &record.achievements,
                &record.issues,
                &record.next_week_plan,
                created_by,
                &now,
                &now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let saved = load_work_record(&tx, id)?
            .ok_or_else(|| RepositoryError::not_found("ModuleWorkRecord", id))?;

        tx.commit()?;
        Ok(WorkRecordWrite::Saved(saved))
    }

    /// 在单个事务内读取记录、修改并写回（排除自身后检查重叠）
    pub fn update_with<F, E>(
        &self,
        id: i64,
        now: NaiveDateTime,
        apply: F,
    ) -> Result<WorkRecordWrite, E>
    where
        F: FnOnce(&mut ModuleWorkRecord) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let mut record = load_work_record(&tx, id)?
            .ok_or_else(|| RepositoryError::not_found("ModuleWorkRecord", id))?;
        apply(&mut record)?;

        if let Some(existing) = find_overlap(
            &tx,
            record.module_id,
            record.week_start,
            record.week_end,
            Some(id),
        )? {
            return Ok(WorkRecordWrite::Overlaps(existing));
        }

        tx.execute(
            r#"UPDATE module_work_records
               SET week_start = ?, week_end = ?, work_content = ?, achievements = ?,
                   issues = ?, next_week_plan = ?, updated_at = ?
               WHERE id = ?"#,
            params![
                record.week_start.format(DATE_FMT).to_string(),
                record.week_end.format(DATE_FMT).to_string(),
                &record.work_content,
                &record.achievements,
                &record.issues,
                &record.next_week_plan,
                now.format(DATETIME_FMT).to_string(),
                id,
            ],
        )
        .map_err(RepositoryError::from)?;
        let saved = load_work_record(&tx, id)?
            .ok_or_else(|| RepositoryError::not_found("ModuleWorkRecord", id))?;

        tx.commit().map_err(RepositoryError::from)?;
        Ok(WorkRecordWrite::Saved(saved))
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ModuleWorkRecord>> {
        let conn = self.get_conn()?;
        load_work_record(&conn, id)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<ModuleWorkRecord> {
        self.find_by_id(id)?
            .ok_or_else(|| RepositoryError::not_found("ModuleWorkRecord", id))
    }

    /// 模块工作记录（周期新的在前，最多 limit 条）
    pub fn list_for_module(
        &self,
        module_id: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<ModuleWorkRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM module_work_records WHERE module_id = ? \
             ORDER BY week_start DESC, id DESC LIMIT ?",
            WORK_RECORD_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![module_id, limit], map_work_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 模块最新一条工作记录
    pub fn latest(&self, module_id: i64) -> RepositoryResult<Option<ModuleWorkRecord>> {
        Ok(self.list_for_module(module_id, 1)?.into_iter().next())
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM module_work_records WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("ModuleWorkRecord", id));
        }
        Ok(())
    }
}

/// 查找与 [start, end] 重叠的记录（闭区间）
fn find_overlap(
    conn: &Connection,
    module_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<i64>,
) -> RepositoryResult<Option<ModuleWorkRecord>> {
    let sql = format!(
        "SELECT {} FROM module_work_records \
         WHERE module_id = ?1 AND week_start <= ?2 AND week_end >= ?3 \
           AND (?4 IS NULL OR id != ?4) \
         ORDER BY week_start LIMIT 1",
        WORK_RECORD_COLUMNS
    );
    let record = conn
        .query_row(
            &sql,
            params![
                module_id,
                end.format(DATE_FMT).to_string(),
                start.format(DATE_FMT).to_string(),
                exclude_id,
            ],
            map_work_record,
        )
        .optional()?;
    Ok(record)
}

fn load_work_record(conn: &Connection, id: i64) -> RepositoryResult<Option<ModuleWorkRecord>> {
    let sql = format!(
        "SELECT {} FROM module_work_records WHERE id = ?",
        WORK_RECORD_COLUMNS
    );
    let record = conn
        .query_row(&sql, params![id], map_work_record)
        .optional()?;
    Ok(record)
}

/// 映射数据库行到 ModuleWorkRecord
fn map_work_record(row: &rusqlite::Row) -> rusqlite::Result<ModuleWorkRecord> {
    Ok(ModuleWorkRecord {
        id: row.get(0)?,
        module_id: row.get(1)?,
        week_start: row.get(2)?,
        week_end: row.get(3)?,
        work_content: row.get(4)?,
        achievements: row.get(5)?,
        issues: row.get(6)?,
        next_week_plan: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
