use serde_json::Value;

use crate::settings::value_to_string;

/// Show/hide animation pair used for new content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub show: String,
    pub hide: String,
    pub show_speed: String,
}

impl Effect {
    /// Whether showing is instantaneous.
    pub fn is_plain(&self) -> bool {
        self.show == "show"
    }
}

/// Pick the effect for a response. Response values win over the
/// descriptor's configuration.
pub fn get_effect(
    response_effect: Option<&str>,
    response_speed: Option<&Value>,
    effect: &str,
    speed: &str,
) -> Effect {
    let kind = response_effect.filter(|e| !e.is_empty()).unwrap_or(effect);
    let speed = response_speed
        .map(value_to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| speed.to_string());

    match kind {
        "none" => Effect {
            show: "show".to_string(),
            hide: "hide".to_string(),
            show_speed: String::new(),
        },
        "fade" => Effect {
            show: "fadeIn".to_string(),
            hide: "fadeOut".to_string(),
            show_speed: speed,
        },
        other => Effect {
            show: format!("{}Toggle", other),
            hide: format!("{}Toggle", other),
            show_speed: speed,
        },
    }
}
