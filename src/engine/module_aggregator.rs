// ==========================================
// 项目进度管理系统 - 模块进度汇总
// ==========================================
// 职责: 计算项目下模块进度的数量与平均值（四舍五入）
// 红线: count == 0 表示"没有模块"，调用方必须单独处理，不能当作均值 0
// ==========================================

use crate::domain::module::{ModuleStats, ProjectModule};
use serde::{Deserialize, Serialize};

/// 模块汇总结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAggregate {
    pub count: usize,
    pub mean: i32, // 0..=100，count == 0 时无意义
}

impl ModuleAggregate {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ==========================================
// ModuleAggregator - 模块汇总器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleAggregator;

impl ModuleAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总一组模块进度
    ///
    /// # 参数
    /// - progresses: 模块进度值（0..=100），可为空
    ///
    /// # 返回
    /// - ModuleAggregate: 均值按四舍五入取整；为空时 count = 0
    pub fn aggregate(&self, progresses: &[i32]) -> ModuleAggregate {
        if progresses.is_empty() {
            return ModuleAggregate { count: 0, mean: 0 };
        }

        let count = progresses.len() as i64;
        let sum: i64 = progresses
            .iter()
            .map(|p| i64::from((*p).clamp(0, 100)))
            .sum();
        // 非负整数的四舍五入
        let mean = (sum + count / 2) / count;

        ModuleAggregate {
            count: progresses.len(),
            mean: mean as i32,
        }
    }

    /// 汇总模块实体
    pub fn aggregate_modules(&self, modules: &[ProjectModule]) -> ModuleAggregate {
        let progresses: Vec<i32> = modules.iter().map(|m| m.progress).collect();
        self.aggregate(&progresses)
    }

    /// 模块统计: 已完成 = 100，进行中 = 1..99，未开始 = 0
    pub fn stats(&self, modules: &[ProjectModule]) -> ModuleStats {
        modules.iter().fold(
            ModuleStats {
                total: modules.len(),
                ..ModuleStats::default()
            },
            |mut stats, module| {
                match module.progress {
                    p if p >= 100 => stats.completed += 1,
                    p if p <= 0 => stats.pending += 1,
                    _ => stats.in_progress += 1,
                }
                stats
            },
        )
    }
}
