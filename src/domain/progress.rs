// ==========================================
// 项目进度管理系统 - 进度计算结果
// ==========================================
// 用途: ProgressCalculator 输出，附带来源与说明（可解释性）
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 进度类别（按状态所处阶段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    FrontStage,    // 前期阶段
    DeliveryStage, // 实施/验收/维保
    Terminal,      // 横向终态
    Vertical,      // 纵向状态
    Unknown,       // 无法识别（防御分支）
}

/// 进度来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Modules,  // 模块平均进度映射
    Manual,   // 手动设置
    Default,  // 阶段默认值
    Status,   // 纵向状态固定值
    Terminal, // 终态固定值
    Error,    // 无法识别状态
}

/// 进度计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResult {
    pub progress: i32, // 0..=100
    pub kind: ProgressKind,
    pub stage: i32, // 阶段序号（终止为 0）
    pub label: String,
    pub source: ProgressSource,
    pub info: String, // 说明文字（含软失败提示）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<JsonValue>,
}

/// 阶段进度限制（供前端进度滑块使用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLimits {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub stage: i32,
    pub label: String,
    pub manual_allowed: bool,
}
