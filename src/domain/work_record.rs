// ==========================================
// 项目进度管理系统 - 模块周工作记录
// ==========================================
// 对齐: module_work_records 表
// 红线: 同一模块的记录周期 [week_start, week_end] 互不重叠
// ==========================================

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ModuleWorkRecord - 周工作记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleWorkRecord {
    pub id: i64,
    pub module_id: i64,

    // ===== 周期（闭区间）=====
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,

    // ===== 内容 =====
    pub work_content: String,
    pub achievements: Option<String>,
    pub issues: Option<String>,
    pub next_week_plan: Option<String>,

    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ModuleWorkRecord {
    /// 周期标签，如 "03/02 - 03/08"
    pub fn week_label(&self) -> String {
        format!(
            "{} - {}",
            self.week_start.format("%m/%d"),
            self.week_end.format("%m/%d")
        )
    }

    /// 与 [start, end] 是否有交集
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.week_start <= end && self.week_end >= start
    }

    /// 包含给定日期的自然周（周一至周日）
    pub fn week_containing(date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let monday = date - Days::new(offset);
        (monday, monday + Days::new(6))
    }
}

/// 新建工作记录参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkRecord {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub work_content: String,
    pub achievements: Option<String>,
    pub issues: Option<String>,
    pub next_week_plan: Option<String>,
}

/// 工作记录更新（可选字段 Some(None) 表示清空）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecordUpdate {
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    pub work_content: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub achievements: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub issues: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "crate::domain::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_week_plan: Option<Option<String>>,
}

impl WorkRecordUpdate {
    pub fn apply_to(&self, record: &mut ModuleWorkRecord) {
        if let Some(week_start) = self.week_start {
            record.week_start = week_start;
        }
        if let Some(week_end) = self.week_end {
            record.week_end = week_end;
        }
        if let Some(content) = &self.work_content {
            record.work_content = content.trim().to_string();
        }
        if let Some(achievements) = &self.achievements {
            record.achievements = achievements.clone();
        }
        if let Some(issues) = &self.issues {
            record.issues = issues.clone();
        }
        if let Some(plan) = &self.next_week_plan {
            record.next_week_plan = plan.clone();
        }
    }
}
