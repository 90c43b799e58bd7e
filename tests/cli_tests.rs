use backdrop_ajax::cli::commands::{cmd_replay, load_page, summarize};
use backdrop_ajax::cli::config::{
    AppConfig, Cli, Commands, DEFAULT_PAGE_URL, PageArgs, TriggerArgs, load_config, resolve_page_url,
    resolve_trace_path,
};
use clap::Parser;

use crate::common::utils::fixture_path;

mod common;

fn fixture_str(name: &str) -> String {
    fixture_path(name).to_str().unwrap().to_string()
}

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_bindings_minimal() {
    let cli = Cli::parse_from(["backdrop-ajax", "bindings", "--page", "page.html"]);
    match cli.command {
        Commands::Bindings { page, format } => {
            assert_eq!(page.page, "page.html");
            assert!(page.settings.is_none());
            assert!(page.url.is_none());
            assert_eq!(format, "text");
        }
        _ => panic!("Expected Bindings command"),
    }
    assert_eq!(cli.verbose, 0);
}

#[test]
fn cli_parse_replay_all_args() {
    let cli = Cli::parse_from([
        "backdrop-ajax",
        "replay",
        "--page",
        "page.html",
        "--settings",
        "settings.json",
        "--url",
        "http://example.com/node/1",
        "--element",
        "edit-submit",
        "--event",
        "mousedown",
        "--responses",
        "responses.json",
        "-o",
        "out.html",
    ]);
    match cli.command {
        Commands::Replay {
            page,
            trigger,
            responses,
            output,
        } => {
            assert_eq!(page.settings.as_deref(), Some("settings.json"));
            assert_eq!(page.url.as_deref(), Some("http://example.com/node/1"));
            assert_eq!(trigger.element, "edit-submit");
            assert_eq!(trigger.event.as_deref(), Some("mousedown"));
            assert_eq!(responses, "responses.json");
            assert_eq!(output.as_deref(), Some("out.html"));
        }
        _ => panic!("Expected Replay command"),
    }
}

#[test]
fn cli_parse_submit_with_globals() {
    let cli = Cli::parse_from([
        "backdrop-ajax",
        "submit",
        "--page",
        "page.html",
        "--element",
        "go",
        "--timeout",
        "5",
        "-vv",
        "--config",
        "custom.yaml",
        "--trace",
        "trace.jsonl",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
    assert_eq!(cli.trace.as_deref(), Some("trace.jsonl"));
    match cli.command {
        Commands::Submit {
            trigger,
            timeout,
            output,
            ..
        } => {
            assert_eq!(trigger.element, "go");
            assert!(trigger.event.is_none());
            assert_eq!(timeout, Some(5));
            assert!(output.is_none());
        }
        _ => panic!("Expected Submit command"),
    }
}

#[test]
fn cli_requires_element_for_replay() {
    let result = Cli::try_parse_from(["backdrop-ajax", "replay", "--page", "p.html", "--responses", "r.json"]);
    assert!(result.is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.http.timeout_secs, 30);
    assert!(config.page.base_url.is_none());
    assert!(config.page.trusted_urls.is_empty());
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert_eq!(config.http.timeout_secs, 30);
    assert!(config.http.user_agent.starts_with("backdrop-ajax/"));
    assert!(config.trace.path.is_none());
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
page:
  base_url: "http://example.com/node/1"
  trusted_urls:
    - "/system/ajax"
http:
  timeout_secs: 5
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.page.base_url.as_deref(), Some("http://example.com/node/1"));
    assert_eq!(config.page.trusted_urls, vec!["/system/ajax"]);
    assert_eq!(config.http.timeout_secs, 5);
    // Unset fields keep their defaults
    assert!(config.http.user_agent.starts_with("backdrop-ajax/"));
    assert!(config.trace.path.is_none());
}

#[test]
fn config_load_from_file_and_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.yaml");
    std::fs::write(&good, "trace:\n  path: /tmp/trace.jsonl\n").unwrap();
    let config = load_config(good.to_str());
    assert_eq!(config.trace.path.as_deref(), Some("/tmp/trace.jsonl"));

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "page: [unclosed").unwrap();
    let config = load_config(bad.to_str());
    assert!(config.trace.path.is_none(), "Malformed file falls back to defaults");
}

#[test]
fn page_url_and_trace_precedence() {
    let mut config = AppConfig::default();
    assert_eq!(resolve_page_url(None, &config), DEFAULT_PAGE_URL);

    config.page.base_url = Some("http://config.example/".to_string());
    assert_eq!(resolve_page_url(None, &config), "http://config.example/");
    assert_eq!(resolve_page_url(Some("http://cli.example/"), &config), "http://cli.example/");

    assert_eq!(resolve_trace_path(None, &config), None);
    config.trace.path = Some("config.jsonl".to_string());
    assert_eq!(resolve_trace_path(None, &config), Some("config.jsonl"));
    assert_eq!(resolve_trace_path(Some("cli.jsonl"), &config), Some("cli.jsonl"));
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn load_page_applies_configured_trust() {
    let args = PageArgs {
        page: fixture_str("links.html"),
        settings: None,
        url: Some("http://example.com/node/1".to_string()),
    };
    let mut config = AppConfig::default();
    config.page.trusted_urls = vec!["http://other.example.org/ajax/x".to_string()];

    let page = load_page(&args, &config, None).unwrap();
    let summaries = summarize(&page);
    assert_eq!(summaries.len(), 5);

    let remote = summaries.iter().find(|s| s.id == "remote").unwrap();
    assert!(remote.trusted);
    assert!(!remote.local);
    assert_eq!(remote.element, "a");
    assert_eq!(remote.event, "click");

    let more = summaries.iter().find(|s| s.id == "more").unwrap();
    assert!(!more.trusted);
    assert!(more.local);
    assert_eq!(more.progress, "throbber");
    assert_eq!(more.method, "replaceWith");
}

#[test]
fn load_page_reports_missing_files() {
    let args = PageArgs {
        page: "no_such_page.html".to_string(),
        settings: None,
        url: None,
    };
    assert!(load_page(&args, &AppConfig::default(), None).is_err());
}

#[test]
fn replay_writes_resulting_page() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.html");
    let trace = dir.path().join("trace.jsonl");

    let args = PageArgs {
        page: fixture_str("commands.html"),
        settings: Some(fixture_str("commands_settings.json")),
        url: Some("http://example.com/node/1".to_string()),
    };
    let trigger = TriggerArgs {
        element: "go".to_string(),
        event: None,
    };
    let applied = cmd_replay(
        &args,
        &trigger,
        &fixture_str("replay_responses.json"),
        output.to_str(),
        &AppConfig::default(),
        trace.to_str(),
    )
    .unwrap();
    assert!(applied);

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("<p>fresh</p>"));
    assert!(!html.contains(r#"<p id="old">"#));

    let lines = std::fs::read_to_string(&trace).unwrap();
    assert!(lines.lines().count() > 0, "Trace written");
}

#[test]
fn replay_with_exhausted_recording_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let responses = dir.path().join("none.json");
    std::fs::write(&responses, r#"{"responses": []}"#).unwrap();
    let output = dir.path().join("out.html");

    let args = PageArgs {
        page: fixture_str("commands.html"),
        settings: Some(fixture_str("commands_settings.json")),
        url: None,
    };
    let trigger = TriggerArgs {
        element: "go".to_string(),
        event: Some("click".to_string()),
    };
    let applied = cmd_replay(
        &args,
        &trigger,
        responses.to_str().unwrap(),
        output.to_str(),
        &AppConfig::default(),
        None,
    )
    .unwrap();
    assert!(!applied);
    assert!(output.exists(), "Page still written");
}

#[test]
fn replay_unknown_element_is_an_error() {
    let args = PageArgs {
        page: fixture_str("commands.html"),
        settings: None,
        url: None,
    };
    let trigger = TriggerArgs {
        element: "missing".to_string(),
        event: None,
    };
    let result = cmd_replay(
        &args,
        &trigger,
        &fixture_str("replay_responses.json"),
        None,
        &AppConfig::default(),
        None,
    );
    assert!(result.is_err());
}
