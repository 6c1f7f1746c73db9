// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// 用途: 状态标签、进度说明文字
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言列表
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// 不支持的语言代码会被忽略（保持当前语言），返回是否切换成功
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) -> bool {
    if !SUPPORTED_LOCALES.contains(&locale) {
        tracing::warn!(locale, "不支持的语言代码，保持当前语言");
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use project_progress::i18n::t;
/// let label = t("status.contract_signed");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// 占位符格式: `%{name}`
///
/// # 示例
/// ```no_run
/// use project_progress::i18n::t_with_args;
/// let msg = t_with_args("progress.manual", &[("progress", "30"), ("min", "25"), ("max", "35")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert!(set_locale("zh-CN"));
        assert_eq!(current_locale(), "zh-CN");

        assert!(set_locale("en"));
        assert_eq!(current_locale(), "en");

        // 不支持的语言不生效
        assert!(!set_locale("fr"));
        assert_eq!(current_locale(), "en");

        set_locale("zh-CN");
    }

    #[test]
    fn test_status_labels() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("status.contract_signed"), "合同签订");

        set_locale("en");
        assert_eq!(t("status.contract_signed"), "Contract signed");

        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args(
            "progress.manual",
            &[("progress", "30"), ("min", "25"), ("max", "35")],
        );
        assert!(msg.contains("30"));
        assert!(msg.contains("[25, 35]"));
        assert!(!msg.contains("%{"));

        set_locale("zh-CN");
    }
}
