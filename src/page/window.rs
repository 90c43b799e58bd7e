use serde::Serialize;

use crate::dom::NodeId;

/// A blocking notification raised by the `alert` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub text: String,
    pub title: Option<String>,
}

/// A show/hide effect applied to new content. Headless pages complete every
/// animation immediately; the record is kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Animation {
    #[serde(skip)]
    pub node: NodeId,
    pub effect: String,
    pub speed: String,
}

/// Browser-level side effects of command processing.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Window {
    pub alerts: Vec<Alert>,
    /// Set by the `redirect` command.
    pub location: Option<String>,
    pub animations: Vec<Animation>,
    /// `@import` targets registered through the stylesheet import hook.
    pub stylesheet_imports: Vec<String>,
    /// Errors reported by progress-bar monitoring.
    pub progress_errors: Vec<String>,
}

impl Window {
    pub fn alert(&mut self, text: &str, title: Option<&str>) {
        self.alerts.push(Alert {
            text: text.to_string(),
            title: title.map(str::to_string),
        });
    }

    pub fn navigate(&mut self, url: &str) {
        self.location = Some(url.to_string());
    }

    pub fn animate(&mut self, node: NodeId, effect: &str, speed: &str) {
        self.animations.push(Animation {
            node,
            effect: effect.to_string(),
            speed: speed.to_string(),
        });
    }

    pub fn add_import(&mut self, url: &str) {
        self.stylesheet_imports.push(url.to_string());
    }
}
