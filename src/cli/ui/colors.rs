use colored::Color;
use colored::Colorize;

use inquire::set_global_render_config;
use inquire::ui::{Color as InquireColor, RenderConfig, StyleSheet, Styled};

use crate::services::ConfigKind;

/// 交互模式的 inquire 主题；设置 `NO_COLOR` 时不使用颜色
pub fn apply_inquire_theme() {
    if std::env::var("NO_COLOR").is_ok() {
        set_global_render_config(RenderConfig::empty());
        return;
    }

    let accent = InquireColor::LightCyan;
    let cfg = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("?").with_fg(accent))
        .with_answered_prompt_prefix(Styled::new(">").with_fg(accent))
        .with_highlighted_option_prefix(Styled::new(">").with_fg(accent))
        .with_selected_option(Some(StyleSheet::new().with_fg(accent)))
        .with_help_message(StyleSheet::new().with_fg(accent))
        .with_answer(StyleSheet::new().with_fg(accent));

    set_global_render_config(cfg);
}

pub fn success(text: &str) -> String {
    text.green().to_string()
}

pub fn error(text: &str) -> String {
    text.red().to_string()
}

pub fn warning(text: &str) -> String {
    text.yellow().to_string()
}

pub fn info(text: &str) -> String {
    text.cyan().to_string()
}

pub fn highlight(text: &str) -> String {
    text.bright_blue().bold().to_string()
}

fn color_for_kind(kind: ConfigKind) -> Color {
    match kind {
        ConfigKind::ProviderZai => Color::BrightGreen,
        ConfigKind::CustomProvider => Color::BrightCyan,
        ConfigKind::ApiKeyMode => Color::BrightMagenta,
        ConfigKind::SubscriptionMode => Color::BrightYellow,
    }
}

/// 按当前配置类型着色
pub fn kind_label(kind: ConfigKind) -> String {
    kind.to_string().color(color_for_kind(kind)).bold().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct ColorOverrideGuard;

    impl ColorOverrideGuard {
        fn force_on() -> Self {
            colored::control::set_override(true);
            Self
        }
    }

    impl Drop for ColorOverrideGuard {
        fn drop(&mut self) {
            colored::control::unset_override();
        }
    }

    #[test]
    #[serial]
    fn kind_label_uses_kind_color() {
        let _guard = ColorOverrideGuard::force_on();

        assert_eq!(
            kind_label(ConfigKind::ProviderZai),
            "z.ai API".color(Color::BrightGreen).bold().to_string()
        );
        assert_eq!(
            kind_label(ConfigKind::SubscriptionMode),
            "Claude subscription"
                .color(Color::BrightYellow)
                .bold()
                .to_string()
        );
    }
}
