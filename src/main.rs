// ==========================================
// 项目进度管理系统 - 主入口
// ==========================================
// 启动: 日志 → 环境配置 → 数据库建表 → 装配 API → 输出部门总览
// 环境变量: DATABASE_PATH / PROJECT_PROGRESS_LOCALE / RUST_LOG / LOG_FORMAT
// ==========================================

use anyhow::Context;
use project_progress::app::AppState;
use project_progress::config::AppConfig;
use project_progress::logging;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", project_progress::APP_NAME);
    tracing::info!("系统版本: {}", project_progress::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env();
    tracing::info!("使用数据库: {}", config.db_path);

    let app_state = AppState::new(config.db_path.clone()).map_err(anyhow::Error::msg)?;
    app_state.apply_locale(config.locale.as_deref());

    let overview = app_state
        .project_api
        .department_overview()
        .context("读取部门总览失败")?;

    println!("{}", serde_json::to_string_pretty(&overview)?);
    Ok(())
}
