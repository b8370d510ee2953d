use colored::Colorize;

pub struct Theme {
    pub prompt: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            prompt: String::from("$ "),
        }
    }
}

/// 未知的主题名回退到默认主题。是否真正输出颜色由 `colored` 的全局开关决定
pub fn load_theme(theme_name: &str) -> Theme {
    match theme_name {
        "color" => Theme {
            prompt: "$ ".bright_cyan().to_string(),
        },
        _ => Theme::default(),
    }
}
