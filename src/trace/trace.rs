use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ajax::lifecycle::LifecycleState;

/// One line of the lifecycle trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub descriptor: String,

    pub state: String,
    pub seq: Option<u64>,
    pub url: Option<String>,

    pub detail: Option<String>,
    pub commands: Vec<String>,
}

impl TraceEvent {
    pub fn now(descriptor: &str, state: LifecycleState) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            descriptor: descriptor.to_string(),
            state: format!("{:?}", state),
            seq: None,
            url: None,
            detail: None,
            commands: vec![],
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }
}
