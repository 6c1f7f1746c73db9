// ==========================================
// 项目进度管理系统 - 成员仓储
// ==========================================
// 表: project_members / module_assignments
// 写入语义: 整体替换（先清空再写入，同一事务）
// ==========================================

use crate::domain::member::{MemberInput, ModuleAssignment, ProjectMember};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::project_repo::{column_code, DATETIME_FMT};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// 负责人在前，其次按加入顺序
const ROLE_ORDER: &str = "CASE role WHEN 'leader' THEN 0 ELSE 1 END, id";

// ==========================================
// MemberRepository - 成员仓储
// ==========================================
pub struct MemberRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MemberRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 替换项目成员
    ///
    /// # 错误
    /// - `RepositoryError::ForeignKeyViolation`: 项目不存在
    /// - `RepositoryError::UniqueConstraintViolation`: 成员重复
    pub fn replace_project_members(
        &self,
        project_id: i64,
        members: &[MemberInput],
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now.format(DATETIME_FMT).to_string();

        tx.execute(
            "DELETE FROM project_members WHERE project_id = ?",
            params![project_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO project_members (project_id, member, role, joined_at) \
                 VALUES (?, ?, ?, ?)",
            )?;
            for input in members {
                stmt.execute(params![
                    project_id,
                    &input.member,
                    input.role_or_default().to_db_str(),
                    &now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 项目成员（负责人在前）
    pub fn list_project_members(&self, project_id: i64) -> RepositoryResult<Vec<ProjectMember>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, project_id, member, role, joined_at FROM project_members \
             WHERE project_id = ? ORDER BY {}",
            ROLE_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let members = stmt
            .query_map(params![project_id], map_member)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// 全部项目成员（部门总览使用）
    pub fn list_all_members(&self) -> RepositoryResult<Vec<ProjectMember>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, project_id, member, role, joined_at FROM project_members \
             ORDER BY project_id, {}",
            ROLE_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let members = stmt
            .query_map([], map_member)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// 替换模块分工
    ///
    /// # 错误
    /// - `RepositoryError::ForeignKeyViolation`: 模块不存在
    pub fn replace_module_assignments(
        &self,
        module_id: i64,
        members: &[MemberInput],
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now.format(DATETIME_FMT).to_string();

        tx.execute(
            "DELETE FROM module_assignments WHERE module_id = ?",
            params![module_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO module_assignments (module_id, member, role, assigned_at) \
                 VALUES (?, ?, ?, ?)",
            )?;
            for input in members {
                stmt.execute(params![
                    module_id,
                    &input.member,
                    input.role_or_default().to_db_str(),
                    &now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 模块分工（负责人在前）
    pub fn list_module_assignments(&self, module_id: i64) -> RepositoryResult<Vec<ModuleAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, module_id, member, role, assigned_at FROM module_assignments \
             WHERE module_id = ? ORDER BY {}",
            ROLE_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params![module_id], |row| {
                Ok(ModuleAssignment {
                    id: row.get(0)?,
                    module_id: row.get(1)?,
                    member: row.get(2)?,
                    role: column_code(row, 3)?,
                    assigned_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }
}

/// 映射数据库行到 ProjectMember
fn map_member(row: &rusqlite::Row) -> rusqlite::Result<ProjectMember> {
    Ok(ProjectMember {
        id: row.get(0)?,
        project_id: row.get(1)?,
        member: row.get(2)?,
        role: column_code(row, 3)?,
        joined_at: row.get(4)?,
    })
}
