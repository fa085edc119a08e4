// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库, 支持俄文（默认）和英文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "ru";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"ru" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use shift_workflow::i18n::t;
/// let msg = t("notification.shift_cancelled");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数, 占位符形如 `%{name}`）
///
/// # 示例
/// ```no_run
/// use shift_workflow::i18n::t_with_args;
/// let msg = t_with_args("notification.shift_started", &[("title", "Весна")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = t(key);
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态, 相关测试串行化
    pub(crate) static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale(DEFAULT_LOCALE);
        assert_eq!(current_locale(), "ru");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("ru");
        assert_eq!(t("notification.shift_cancelled"), "Смена отменена. Спасибо за участие!");

        set_locale("en");
        assert_eq!(
            t("notification.shift_cancelled"),
            "The shift has been cancelled. Thank you for taking part!"
        );

        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("notification.report_declined_reason", &[("reason", "blurry photo")]);
        assert_eq!(msg, "Your report was declined. Reason: blurry photo");

        set_locale("ru");
        let msg = t_with_args("notification.member_excluded", &[("title", "Весна")]);
        assert!(msg.contains("«Весна»"));
        assert!(!msg.contains("%{title}"));
    }
}
