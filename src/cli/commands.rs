use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::ajax::lifecycle::{Completion, DomEvent};
use crate::ajax::progress::ProgressKind;
use crate::ajax::runner::trigger_and_wait;
use crate::ajax::url::url_is_local;
use crate::cli::config::{AppConfig, PageArgs, TriggerArgs, resolve_page_url, resolve_trace_path};
use crate::dom::NodeId;
use crate::page::{BindingKind, Page};
use crate::settings::Settings;
use crate::trace::logger::TraceLogger;
use crate::transport::{HttpTransport, ReplayTransport, Transport};

// ============================================================================
// bindings subcommand
// ============================================================================

/// What `bindings` reports per descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorSummary {
    pub id: String,
    pub element: String,
    pub url: String,
    pub event: String,
    pub method: String,
    pub progress: String,
    pub trusted: bool,
    pub local: bool,
}

pub fn cmd_bindings(
    args: &PageArgs,
    format: &str,
    config: &AppConfig,
    trace: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = load_page(args, config, trace)?;
    let summaries = summarize(&page);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summaries)?),
        _ => {
            println!("{} AJAX descriptors", summaries.len());
            for s in &summaries {
                println!(
                    "  {} <{}> {} on {} -> {} ({}){}{}",
                    s.id,
                    s.element,
                    s.url,
                    s.event,
                    s.method,
                    s.progress,
                    if s.trusted { " trusted" } else { "" },
                    if s.local { "" } else { " NOT LOCAL" },
                );
            }
        }
    }
    Ok(())
}

pub fn summarize(page: &Page) -> Vec<DescriptorSummary> {
    let base_path = page.settings.base_path();
    page.descriptors()
        .map(|d| DescriptorSummary {
            id: d.id.clone(),
            element: page.document.tag(d.element).unwrap_or_default().to_string(),
            url: d.url.clone(),
            event: d.event.clone(),
            method: d.method.clone(),
            progress: match d.progress.kind {
                ProgressKind::Throbber => "throbber",
                ProgressKind::Bar => "bar",
                ProgressKind::None => "none",
            }
            .to_string(),
            trusted: d.is_trusted(&page.settings),
            local: url_is_local(&d.url, &page.url, &base_path),
        })
        .collect()
}

// ============================================================================
// replay / submit subcommands
// ============================================================================

pub fn cmd_replay(
    args: &PageArgs,
    trigger: &TriggerArgs,
    responses: &str,
    output: Option<&str>,
    config: &AppConfig,
    trace: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(responses)?;
    let transport = ReplayTransport::from_json(&text)?;
    let mut page = load_page(args, config, trace)?;
    run_trigger(&mut page, trigger, &transport, output)
}

pub fn cmd_submit(
    args: &PageArgs,
    trigger: &TriggerArgs,
    timeout: Option<u64>,
    output: Option<&str>,
    config: &AppConfig,
    trace: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut page = load_page(args, config, trace)?;
    let timeout = Duration::from_secs(timeout.unwrap_or(config.http.timeout_secs));
    let transport = HttpTransport::new(&page.url, timeout, &config.http.user_agent)?;
    run_trigger(&mut page, trigger, &transport, output)
}

/// Trigger the element, report each completion and emit the resulting
/// page. Returns whether every request applied.
fn run_trigger<T>(
    page: &mut Page,
    trigger: &TriggerArgs,
    transport: &T,
    output: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>>
where
    T: Transport + Sync,
{
    let element = page
        .document
        .element_by_id(&trigger.element)
        .ok_or_else(|| format!("no element with id '{}'", trigger.element))?;
    let event = resolve_event(page, element, trigger.event.as_deref());

    let completions = trigger_and_wait(page, element, &event, transport)?;
    let mut all_applied = true;
    for completion in &completions {
        match completion {
            Completion::Applied { commands } => eprintln!("applied {} commands", commands),
            Completion::Superseded => eprintln!("response superseded"),
            Completion::Failed(e) => {
                all_applied = false;
                eprintln!("request failed: {}", e);
            }
        }
    }
    for alert in &page.window.alerts {
        eprintln!("alert: {}", alert.text);
    }
    if let Some(location) = &page.window.location {
        eprintln!("redirect: {}", location);
    }

    let html = page.document.to_html();
    match output {
        Some(path) => std::fs::write(path, &html)?,
        None => print!("{}", html),
    }
    Ok(all_applied)
}

// ============================================================================
// Helpers
// ============================================================================

/// Read the page and its settings, add configured trusted URLs and attach
/// behaviours.
pub fn load_page(
    args: &PageArgs,
    config: &AppConfig,
    trace: Option<&str>,
) -> Result<Page, Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(&args.page)?;
    let mut settings = match &args.settings {
        Some(path) => Settings::from_json_str(&std::fs::read_to_string(path)?)?,
        None => Settings::new(),
    };
    for url in &config.page.trusted_urls {
        settings.trust_url(url);
    }

    let url = resolve_page_url(args.url.as_deref(), config);
    let tracer = match resolve_trace_path(trace, config) {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    if !tracer.is_enabled() {
        debug!("lifecycle tracing off");
    }

    let mut page = Page::new(&html, &url, settings).with_tracer(tracer);
    page.ready();
    info!(descriptors = page.descriptors().count(), url = %url, "page ready");
    Ok(page)
}

/// The requested event, or the first trigger event bound to the element.
fn resolve_event(page: &Page, element: NodeId, requested: Option<&str>) -> DomEvent {
    if let Some(name) = requested {
        return DomEvent::named(name);
    }
    page.bindings()
        .iter()
        .filter(|b| b.element == element)
        .find_map(|b| match &b.kind {
            BindingKind::Trigger(name) => Some(DomEvent::named(name)),
            _ => None,
        })
        .unwrap_or_else(DomEvent::click)
}
