use serde_json::Value;

use crate::settings::Settings;

/// Translate a user-facing string and substitute placeholders.
///
/// Translations come from `settings.locale.strings[""][source]`.
/// Placeholders follow the CMS convention: `@name` is HTML-escaped,
/// `%name` is escaped and emphasised, `!name` is inserted verbatim.
pub fn t(settings: &Settings, source: &str, args: &[(&str, &str)]) -> String {
    let text = settings
        .get("locale")
        .and_then(|l| l.get("strings"))
        .and_then(|s| s.get(""))
        .and_then(|ctx| ctx.get(source))
        .and_then(Value::as_str)
        .unwrap_or(source);
    format_string(text, args)
}

pub fn format_string(text: &str, args: &[(&str, &str)]) -> String {
    let mut out = text.to_string();
    for (key, value) in args {
        let replacement = match key.chars().next() {
            Some('@') => check_plain(value),
            Some('%') => format!("<em class=\"placeholder\">{}</em>", check_plain(value)),
            _ => value.to_string(),
        };
        out = out.replace(key, &replacement);
    }
    out
}

/// Escape text for safe inclusion in HTML.
pub fn check_plain(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Human-readable byte size ("512 bytes", "1.5 KB", "2 MB").
pub fn format_size(settings: &Settings, size: u64) -> String {
    if size < 1024 {
        if size == 1 {
            return t(settings, "1 byte", &[]);
        }
        let count = size.to_string();
        return t(settings, "@count bytes", &[("@count", count.as_str())]);
    }
    let units = ["KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < units.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    let template = format!("@size {}", units[unit]);
    t(settings, &template, &[("@size", rounded)])
}
