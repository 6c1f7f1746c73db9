// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置读写、默认值、快照恢复，以及开关对状态流转的影响
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use project_progress::config::{config_keys, ConfigManager};
use project_progress::domain::types::{ProjectSource, ProjectStatus};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_defaults_without_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config_manager.get_locale().unwrap(), "zh-CN");
    assert!(config_manager.get_auto_transition_enabled().unwrap());
    assert_eq!(
        config_manager.get_default_project_source().unwrap(),
        ProjectSource::Horizontal
    );
    assert_eq!(
        config_manager
            .get_global_config_value(config_keys::LOCALE)
            .unwrap(),
        None
    );
}

#[test]
fn test_read_inserted_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, config_keys::AUTO_TRANSITION_ENABLED, "off")
        .expect("Failed to insert test config");
    insert_test_config(&conn, config_keys::DEFAULT_PROJECT_SOURCE, "self_developed")
        .expect("Failed to insert test config");

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    assert!(!config_manager.get_auto_transition_enabled().unwrap());
    assert_eq!(
        config_manager.get_default_project_source().unwrap(),
        ProjectSource::SelfDeveloped
    );
}

#[test]
fn test_invalid_values_fall_back_to_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, config_keys::AUTO_TRANSITION_ENABLED, "maybe").unwrap();
    insert_test_config(&conn, config_keys::DEFAULT_PROJECT_SOURCE, "external").unwrap();
    insert_test_config(&conn, config_keys::LOCALE, "fr").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    assert!(config_manager.get_auto_transition_enabled().unwrap());
    assert_eq!(
        config_manager.get_default_project_source().unwrap(),
        ProjectSource::Horizontal
    );
    assert_eq!(config_manager.get_locale().unwrap(), "zh-CN");
}

#[test]
fn test_set_locale_rejects_unsupported() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert!(config_manager.set_locale("fr").is_err());
    config_manager.set_locale("en").expect("Failed to set locale");
    assert_eq!(config_manager.get_locale().unwrap(), "en");
}

#[test]
fn test_snapshot_and_restore() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::AUTO_TRANSITION_ENABLED, "false")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::DEFAULT_PROJECT_SOURCE, "vertical")
        .unwrap();
    let snapshot = config_manager.get_config_snapshot().unwrap();

    config_manager
        .set_global_config_value(config_keys::AUTO_TRANSITION_ENABLED, "true")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::DEFAULT_PROJECT_SOURCE, "horizontal")
        .unwrap();

    let restored = config_manager
        .restore_config_from_snapshot(&snapshot)
        .unwrap();
    assert_eq!(restored, 2);
    assert!(!config_manager.get_auto_transition_enabled().unwrap());
    assert_eq!(
        config_manager.get_default_project_source().unwrap(),
        ProjectSource::Vertical
    );

    assert!(config_manager.restore_config_from_snapshot("not json").is_err());
}

#[test]
fn test_auto_transition_disabled_keeps_status() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_manager
        .set_global_config_value(config_keys::AUTO_TRANSITION_ENABLED, "false")
        .unwrap();

    let id = env.create_project_at("不流转", ProjectSource::Horizontal, "project_implementation");
    let module = env.add_module(id, "m", 40);

    let change = env
        .module_api
        .update_module_progress(module.id, 100, None, "tester")
        .expect("更新失败");

    // 缓存进度照常写回，状态不变
    let sync = change.sync.expect("应触发同步");
    assert_eq!(sync.progress, 100);
    assert!(sync.transition.is_none());

    let project = env.project_repo.get(id).expect("项目应存在");
    assert_eq!(project.progress, 100);
    assert_eq!(project.status, ProjectStatus::ProjectImplementation);
}
