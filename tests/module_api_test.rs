// ==========================================
// ModuleApi 集成测试
// ==========================================
// 测试范围:
// 1. 模块创建: 状态/进度协调
// 2. 模块更新: 状态变化重新协调、进度历史
// 3. 模块删除: 触发父项目重新汇总
// 4. 模块分工与周工作记录
// 5. 并发: 同时更新多个模块不丢失汇总，改名不覆盖进度
// ==========================================

mod helpers;

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use helpers::api_test_helper::*;
use project_progress::api::ApiError;
use project_progress::domain::types::{MemberRole, ModuleStatus, ProjectSource, ProjectStatus};
use project_progress::domain::{
    MemberInput, ModuleUpdate, NewModule, NewWorkRecord, WorkRecordUpdate,
};

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).expect("日期无效")
}

fn week(start: NaiveDate, content: &str) -> NewWorkRecord {
    NewWorkRecord {
        week_start: start,
        week_end: start + chrono::Days::new(6),
        work_content: content.to_string(),
        achievements: None,
        issues: None,
        next_week_plan: None,
    }
}

// ==========================================
// 模块创建
// ==========================================

#[test]
fn test_create_module_完成状态强制100() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("协调", ProjectSource::Horizontal, "project_implementation");

    let module = env.add_module_with_status(id, "已完成", 30, ModuleStatus::Completed);
    assert_eq!(module.progress, 100);
    assert_eq!(module.status, ModuleStatus::Completed);
}

#[test]
fn test_create_module_进行中状态修正进度() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("协调", ProjectSource::Horizontal, "project_implementation");

    let zero = env.add_module_with_status(id, "刚开始", 0, ModuleStatus::InProgress);
    assert_eq!(zero.progress, 10);

    let full = env.add_module_with_status(id, "快结束", 100, ModuleStatus::InProgress);
    assert_eq!(full.progress, 99);
    assert_eq!(full.status, ModuleStatus::InProgress);
}

#[test]
fn test_create_module_未指定状态按进度推断() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("推断", ProjectSource::Horizontal).project.id;

    assert_eq!(env.add_module(id, "a", 0).status, ModuleStatus::NotStarted);
    assert_eq!(env.add_module(id, "b", 45).status, ModuleStatus::InProgress);
}

#[test]
fn test_create_module_参数校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("校验", ProjectSource::Horizontal).project.id;

    assert_invalid_input(env.module_api.create_module(
        id,
        &NewModule {
            name: "  ".to_string(),
            ..Default::default()
        },
    ));
    assert_invalid_input(env.module_api.create_module(
        id,
        &NewModule {
            name: "越界".to_string(),
            progress: Some(101),
            ..Default::default()
        },
    ));
    assert_not_found(env.module_api.create_module(
        9999,
        &NewModule {
            name: "孤儿".to_string(),
            ..Default::default()
        },
    ));
}

#[test]
fn test_list_modules_按优先级排序() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("排序", ProjectSource::Horizontal).project.id;

    for (name, priority) in [("低", 1), ("高", 5), ("中", 3)] {
        env.module_api
            .create_module(
                id,
                &NewModule {
                    name: name.to_string(),
                    priority: Some(priority),
                    ..Default::default()
                },
            )
            .expect("创建失败");
    }

    let names: Vec<String> = env
        .module_api
        .list_modules(id)
        .expect("查询失败")
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["高", "中", "低"]);
}

// ==========================================
// 模块更新
// ==========================================

#[test]
fn test_update_module_状态变化重新协调并同步() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("更新", ProjectSource::Horizontal, "project_implementation");
    let a = env.add_module(id, "a", 40);
    env.add_module(id, "b", 60);
    assert_eq!(env.cached_progress(id), 50);

    let change = env
        .module_api
        .update_module(
            a.id,
            &ModuleUpdate {
                status: Some(ModuleStatus::Completed),
                ..Default::default()
            },
        )
        .expect("更新失败");

    assert_eq!(change.module.as_ref().map(|m| m.progress), Some(100));
    let sync = change.sync.expect("进度变化应触发同步");
    assert_eq!(sync.progress, 80);
    assert_eq!(env.cached_progress(id), 80);
}

#[test]
fn test_update_module_仅改名不触发同步() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("改名", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "旧名", 30);

    let change = env
        .module_api
        .update_module(
            module.id,
            &ModuleUpdate {
                name: Some("新名".to_string()),
                ..Default::default()
            },
        )
        .expect("更新失败");

    assert!(change.sync.is_none());
    assert_eq!(change.module.map(|m| m.name), Some("新名".to_string()));
}

#[test]
fn test_update_module_清空描述与日期() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("清空", ProjectSource::Horizontal).project.id;
    let module = env
        .module_api
        .create_module(
            id,
            &NewModule {
                name: "接口".to_string(),
                description: Some("对接网关".to_string()),
                start_date: Some(day(3, 1)),
                end_date: Some(day(3, 31)),
                ..Default::default()
            },
        )
        .expect("创建失败")
        .module
        .expect("应返回模块");

    let updated = env
        .module_api
        .update_module(
            module.id,
            &ModuleUpdate {
                description: Some(None),
                end_date: Some(None),
                ..Default::default()
            },
        )
        .expect("更新失败")
        .module
        .expect("应返回模块");
    assert_eq!(updated.description, None);
    assert_eq!(updated.end_date, None);
    assert_eq!(updated.start_date, Some(day(3, 1)));

    // 日期倒置整体拒绝，名称也不写入
    assert_invalid_input(env.module_api.update_module(
        module.id,
        &ModuleUpdate {
            name: Some("不应生效".to_string()),
            end_date: Some(Some(day(2, 1))),
            ..Default::default()
        },
    ));
    assert_eq!(
        env.module_api.get_module(module.id).expect("查询失败").name,
        "接口"
    );
    assert_not_found(env.module_api.update_module(9999, &ModuleUpdate::default()));
}

#[test]
fn test_update_module_progress_写入历史() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("历史", ProjectSource::Horizontal, "project_implementation");
    let module = env.add_module(id, "m", 0);

    env.module_api
        .update_module_progress(module.id, 30, Some("第一周".to_string()), "alice")
        .expect("更新失败");
    let change = env
        .module_api
        .update_module_progress(module.id, 70, None, "bob")
        .expect("更新失败");

    let module = change.module.expect("应返回模块");
    assert_eq!(module.progress, 70);
    assert_eq!(module.status, ModuleStatus::InProgress);

    let history = env
        .module_api
        .module_progress_history(module.id)
        .expect("查询失败");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].progress, 70);
    assert_eq!(history[0].updated_by, "bob");
    assert_eq!(history[1].notes.as_deref(), Some("第一周"));

    assert_invalid_input(env.module_api.update_module_progress(module.id, -1, None, "bob"));
}

// ==========================================
// 模块删除
// ==========================================

#[test]
fn test_delete_module_重新汇总() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("删除", ProjectSource::Horizontal, "project_implementation");
    let slow = env.add_module(id, "慢", 20);
    env.add_module(id, "快", 100);
    assert_eq!(env.cached_progress(id), 60);

    // 删除未完成模块后剩余模块均值为 100，流转到验收
    let change = env.module_api.delete_module(slow.id).expect("删除失败");
    assert!(change.module.is_none());
    let sync = change.sync.expect("仍有模块，应同步");
    assert_eq!(sync.progress, 100);
    assert_eq!(
        sync.transition.map(|t| t.to),
        Some(ProjectStatus::ProjectAcceptance)
    );

    assert_not_found(env.module_api.get_module(slow.id));
}

#[test]
fn test_delete_module_最后一个模块不改缓存() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("清空", ProjectSource::Horizontal, "project_implementation");
    let only = env.add_module(id, "唯一", 40);
    assert_eq!(env.cached_progress(id), 40);

    let change = env.module_api.delete_module(only.id).expect("删除失败");
    assert!(change.sync.is_none());
    assert_eq!(env.cached_progress(id), 40);

    // 无模块时实时计算回到阶段默认值
    let view = env.project_api.get_project(id).expect("查询失败");
    assert_eq!(view.computed.progress, 60);
}

#[test]
fn test_delete_project_级联删除模块() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("级联", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "m", 10);

    env.project_api.delete_project(id).expect("删除失败");
    assert_not_found(env.module_api.get_module(module.id));
    assert_not_found(env.project_api.get_project(id));
}

// ==========================================
// 模块分工
// ==========================================

#[test]
fn test_assign_members_整体替换() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("分工", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "前端", 0);

    let assigned = env
        .module_api
        .assign_members(
            module.id,
            &[
                MemberInput::new("bob", MemberRole::Member),
                MemberInput::new("alice", MemberRole::Leader),
            ],
        )
        .expect("分配失败");
    let names: Vec<&str> = assigned.iter().map(|a| a.member.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let assigned = env
        .module_api
        .assign_members(
            module.id,
            &[MemberInput {
                member: "carol".to_string(),
                role: None,
            }],
        )
        .expect("分配失败");
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].role, MemberRole::Member);
    assert_eq!(
        env.module_api
            .list_module_assignments(module.id)
            .expect("查询失败"),
        assigned
    );

    assert_invalid_input(env.module_api.assign_members(
        module.id,
        &[
            MemberInput::new("dave", MemberRole::Member),
            MemberInput::new("dave", MemberRole::Leader),
        ],
    ));
    assert_not_found(
        env.module_api
            .assign_members(9999, &[MemberInput::new("dave", MemberRole::Member)]),
    );

    // 分工不影响模块进度与父项目
    assert_eq!(
        env.module_api.get_module(module.id).expect("查询失败").progress,
        0
    );
}

// ==========================================
// 周工作记录
// ==========================================

#[test]
fn test_work_records_新增与查询() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("周报", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "后端", 20);

    let first = env
        .module_api
        .add_work_record(module.id, &week(day(3, 2), "搭建框架"), "alice")
        .expect("添加失败");
    assert_eq!(first.week_label(), "03/02 - 03/08");
    assert_eq!(first.created_by, "alice");

    // 周期早于已有记录也可补录
    env.module_api
        .add_work_record(module.id, &week(day(2, 23), "需求评审"), "alice")
        .expect("补录失败");
    env.module_api
        .add_work_record(module.id, &week(day(3, 9), "  接口开发  "), "bob")
        .expect("添加失败");

    let records = env
        .module_api
        .list_work_records(module.id, None)
        .expect("查询失败");
    let contents: Vec<&str> = records.iter().map(|r| r.work_content.as_str()).collect();
    assert_eq!(contents, vec!["接口开发", "搭建框架", "需求评审"]);

    let limited = env
        .module_api
        .list_work_records(module.id, Some(2))
        .expect("查询失败");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].week_start, day(3, 9));

    let latest = env
        .module_api
        .latest_work_record(module.id)
        .expect("查询失败")
        .expect("应有最新记录");
    assert_eq!(latest.week_start, day(3, 9));
    assert_eq!(latest.created_by, "bob");

    // 工作记录不影响模块进度
    assert_eq!(
        env.module_api.get_module(module.id).expect("查询失败").progress,
        20
    );
}

#[test]
fn test_work_records_周期重叠被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("重叠", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "m", 0);
    let other = env.add_module(id, "n", 0);

    env.module_api
        .add_work_record(module.id, &week(day(3, 2), "第一周"), "alice")
        .expect("添加失败");

    // 首尾相接的一天也算重叠
    let overlapping = NewWorkRecord {
        week_start: day(3, 8),
        week_end: day(3, 14),
        ..week(day(3, 8), "跨周")
    };
    match env
        .module_api
        .add_work_record(module.id, &overlapping, "alice")
    {
        Err(ApiError::BusinessRuleViolation(msg)) => {
            assert!(msg.contains("2026-03-02"), "应指出冲突周期: {}", msg);
            assert!(msg.contains("2026-03-08"), "应指出冲突周期: {}", msg);
        }
        other => panic!("预期BusinessRuleViolation错误，但得到: {:?}", other),
    }

    // 其他模块不受影响
    env.module_api
        .add_work_record(other.id, &overlapping, "alice")
        .expect("其他模块应可添加");
    assert_eq!(
        env.module_api
            .list_work_records(module.id, None)
            .expect("查询失败")
            .len(),
        1
    );
}

#[test]
fn test_work_records_参数校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("周报校验", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "m", 0);

    let reversed = NewWorkRecord {
        week_start: day(3, 8),
        week_end: day(3, 2),
        ..week(day(3, 2), "倒置")
    };
    assert_invalid_input(env.module_api.add_work_record(module.id, &reversed, "alice"));
    assert_invalid_input(env.module_api.add_work_record(
        module.id,
        &week(day(3, 2), "   "),
        "alice",
    ));
    assert_invalid_input(env.module_api.add_work_record(
        module.id,
        &week(day(3, 2), "内容"),
        " ",
    ));
    assert_not_found(env.module_api.add_work_record(9999, &week(day(3, 2), "内容"), "alice"));
    assert_not_found(env.module_api.list_work_records(9999, None));
    assert!(env
        .module_api
        .latest_work_record(module.id)
        .expect("查询失败")
        .is_none());
}

#[test]
fn test_work_records_更新与删除() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project("改周报", ProjectSource::Horizontal).project.id;
    let module = env.add_module(id, "m", 0);

    let first = env
        .module_api
        .add_work_record(
            module.id,
            &NewWorkRecord {
                issues: Some("环境未就绪".to_string()),
                ..week(day(3, 2), "第一周")
            },
            "alice",
        )
        .expect("添加失败");
    let second = env
        .module_api
        .add_work_record(module.id, &week(day(3, 9), "第二周"), "alice")
        .expect("添加失败");

    let updated = env
        .module_api
        .update_work_record(
            first.id,
            &WorkRecordUpdate {
                achievements: Some(Some("完成部署".to_string())),
                issues: Some(None),
                ..Default::default()
            },
        )
        .expect("更新失败");
    assert_eq!(updated.achievements.as_deref(), Some("完成部署"));
    assert_eq!(updated.issues, None);
    assert_eq!(updated.work_content, "第一周");

    // 改期与另一条记录重叠被拒绝，原记录不变
    let moved = env.module_api.update_work_record(
        first.id,
        &WorkRecordUpdate {
            week_end: Some(day(3, 10)),
            ..Default::default()
        },
    );
    assert!(matches!(moved, Err(ApiError::BusinessRuleViolation(_))));
    assert_invalid_input(env.module_api.update_work_record(
        first.id,
        &WorkRecordUpdate {
            week_start: Some(day(3, 20)),
            ..Default::default()
        },
    ));
    let records = env
        .module_api
        .list_work_records(module.id, None)
        .expect("查询失败");
    let reloaded = records
        .iter()
        .find(|r| r.id == first.id)
        .expect("记录应存在");
    assert_eq!(reloaded.week_end, day(3, 8));
    assert_eq!(reloaded.achievements.as_deref(), Some("完成部署"));

    env.module_api
        .delete_work_record(second.id)
        .expect("删除失败");
    assert_not_found(env.module_api.delete_work_record(second.id));
    assert_eq!(
        env.module_api
            .latest_work_record(module.id)
            .expect("查询失败")
            .map(|r| r.id),
        Some(first.id)
    );

    // 删除模块级联删除工作记录
    env.module_api.delete_module(module.id).expect("删除失败");
    assert_not_found(env.module_api.update_work_record(first.id, &WorkRecordUpdate::default()));
}

// ==========================================
// 并发
// ==========================================

#[test]
fn test_并发更新模块_共享连接不丢失汇总() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("并发", ProjectSource::Horizontal, "project_implementation");
    let modules: Vec<i64> = (0..4)
        .map(|i| env.add_module(id, &format!("m{}", i), 1).id)
        .collect();

    let module_api = Arc::clone(&env.module_api);
    let handles: Vec<_> = modules
        .iter()
        .enumerate()
        .map(|(i, module_id)| {
            let api = Arc::clone(&module_api);
            let module_id = *module_id;
            thread::spawn(move || {
                for step in 1..=5 {
                    let progress = (i as i32 + 1) * 10 + step;
                    api.update_module_progress(module_id, progress, None, "worker")
                        .expect("并发更新失败");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("线程异常");
    }

    // 终值: 15, 25, 35, 45 → 均值 30
    assert_eq!(env.cached_progress(id), 30);
}

#[test]
fn test_并发更新模块_独立连接不丢失汇总() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_project_at("多连接", ProjectSource::Horizontal, "project_implementation");
    let first = env.add_module(id, "甲", 1).id;
    let second = env.add_module(id, "乙", 1).id;

    let other = env.open_second_state().expect("打开第二连接失败");
    let api_a = Arc::clone(&env.module_api);
    let api_b = Arc::clone(&other.module_api);

    let a = thread::spawn(move || {
        for progress in [10, 20, 30, 40] {
            api_a
                .update_module_progress(first, progress, None, "a")
                .expect("连接A更新失败");
        }
    });
    let b = thread::spawn(move || {
        for progress in [50, 60, 70, 80] {
            api_b
                .update_module_progress(second, progress, None, "b")
                .expect("连接B更新失败");
        }
    });
    a.join().expect("线程异常");
    b.join().expect("线程异常");

    // 终值 40 / 80 → 均值 60，两个连接的最后一次汇总都看到对方的提交
    assert_eq!(env.cached_progress(id), 60);
    let project = env.project_repo.get(id).expect("项目应存在");
    assert_eq!(project.status, ProjectStatus::ProjectImplementation);
}

#[test]
fn test_并发改名与进度更新_进度不被覆盖() {
    for round in 0..5 {
        let env = ApiTestEnv::new().expect("无法创建测试环境");
        let id = env.create_project_at(
            &format!("改名{}", round),
            ProjectSource::Horizontal,
            "project_implementation",
        );
        let module_id = env.add_module(id, "唯一", 1).id;

        let other = env.open_second_state().expect("打开第二连接失败");
        let renamer = Arc::clone(&env.module_api);
        let updater = Arc::clone(&other.module_api);

        let a = thread::spawn(move || {
            for i in 0..40 {
                renamer
                    .update_module(
                        module_id,
                        &ModuleUpdate {
                            name: Some(format!("改名{}", i)),
                            ..Default::default()
                        },
                    )
                    .expect("改名失败");
            }
        });
        let b = thread::spawn(move || {
            updater
                .update_module_progress(module_id, 100, None, "b")
                .expect("进度更新失败");
        });
        a.join().expect("线程异常");
        b.join().expect("线程异常");

        let module = env.module_api.get_module(module_id).expect("查询失败");
        assert_eq!(module.progress, 100, "第{}轮模块进度被改名覆盖", round);
        assert_eq!(module.status, ModuleStatus::Completed);
        assert_eq!(module.name, "改名39");

        let project = env.project_repo.get(id).expect("项目应存在");
        assert_eq!(project.progress, 100);
        assert_eq!(project.status, ProjectStatus::ProjectAcceptance);
    }
}
