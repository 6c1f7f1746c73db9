// ==========================================
// 项目进度管理系统 - 模块进度/状态一致性
// ==========================================
// 职责: 创建/修改模块时协调 (progress, status)
// 规则（按请求的状态）:
//   completed   → progress = 100
//   not_started → progress = 0
//   in_progress → progress ∈ [1, 99]（≤0 取 10，≥100 取 99）
//   paused      → progress 保持不变
//   未指定      → 由进度推断状态
// ==========================================

use crate::domain::types::ModuleStatus;

/// in_progress 且未给出有效进度时的默认值
pub const IN_PROGRESS_DEFAULT: i32 = 10;
/// in_progress 状态允许的最大进度
pub const IN_PROGRESS_CAP: i32 = 99;

/// 协调后的模块进度与状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleState {
    pub progress: i32,
    pub status: ModuleStatus,
}

/// 协调请求的进度与状态
///
/// # 参数
/// - progress: 请求的进度（调用方已保证 0..=100）
/// - status: 请求的状态，None 表示由进度推断
pub fn reconcile(progress: i32, status: Option<ModuleStatus>) -> ModuleState {
    match status {
        Some(ModuleStatus::Completed) => ModuleState {
            progress: 100,
            status: ModuleStatus::Completed,
        },
        Some(ModuleStatus::NotStarted) => ModuleState {
            progress: 0,
            status: ModuleStatus::NotStarted,
        },
        Some(ModuleStatus::InProgress) => {
            let progress = if progress <= 0 {
                IN_PROGRESS_DEFAULT
            } else if progress >= 100 {
                IN_PROGRESS_CAP
            } else {
                progress
            };
            ModuleState {
                progress,
                status: ModuleStatus::InProgress,
            }
        }
        Some(ModuleStatus::Paused) => ModuleState {
            progress,
            status: ModuleStatus::Paused,
        },
        None => ModuleState {
            progress,
            status: ModuleStatus::from_progress(progress),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_forces_100() {
        assert_eq!(
            reconcile(30, Some(ModuleStatus::Completed)),
            ModuleState {
                progress: 100,
                status: ModuleStatus::Completed
            }
        );
    }

    #[test]
    fn test_not_started_forces_0() {
        assert_eq!(reconcile(70, Some(ModuleStatus::NotStarted)).progress, 0);
    }

    #[test]
    fn test_in_progress_clamps() {
        assert_eq!(reconcile(0, Some(ModuleStatus::InProgress)).progress, 10);
        assert_eq!(reconcile(100, Some(ModuleStatus::InProgress)).progress, 99);
        assert_eq!(reconcile(45, Some(ModuleStatus::InProgress)).progress, 45);
    }

    #[test]
    fn test_paused_keeps_progress() {
        let state = reconcile(0, Some(ModuleStatus::Paused));
        assert_eq!(state.progress, 0);
        assert_eq!(state.status, ModuleStatus::Paused);
        assert_eq!(reconcile(100, Some(ModuleStatus::Paused)).progress, 100);
    }

    #[test]
    fn test_infer_status_from_progress() {
        assert_eq!(reconcile(0, None).status, ModuleStatus::NotStarted);
        assert_eq!(reconcile(100, None).status, ModuleStatus::Completed);
        assert_eq!(reconcile(55, None).status, ModuleStatus::InProgress);
    }
}
