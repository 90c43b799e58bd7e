use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::ajax::error::AjaxError;
use crate::ajax::lifecycle::{Completion, DomEvent, PendingRequest};
use crate::dom::NodeId;
use crate::page::Page;
use crate::transport::{Transport, TransportError};

const TICK: Duration = Duration::from_millis(10);

/// Send one pending request and complete it.
///
/// The request runs on a scoped worker thread while this thread polls the
/// progress endpoint of a monitoring progress bar at its interval. The page
/// is only touched from this thread.
pub fn submit_blocking<T>(page: &mut Page, pending: PendingRequest, transport: &T) -> Result<Completion, AjaxError>
where
    T: Transport + Sync,
{
    let PendingRequest { handle, request } = pending;
    let url = request.url.clone();
    debug!(url = %url, seq = handle.seq, "sending ajax request");

    let result = thread::scope(|scope| {
        let worker = scope.spawn(|| transport.send(&request));

        let mut last_poll = Instant::now();
        while !worker.is_finished() {
            match page.progress_monitor(handle.descriptor) {
                Some(monitor) if last_poll.elapsed() >= monitor.interval => {
                    last_poll = Instant::now();
                    page.poll_progress(handle.descriptor, transport);
                }
                _ => thread::sleep(TICK),
            }
        }

        worker
            .join()
            .unwrap_or_else(|_| Err(TransportError::WorkerPanicked { url: url.clone() }))
    });

    page.complete(handle, result)
}

/// Deliver an event and run every request it starts to completion, in
/// issue order.
pub fn trigger_and_wait<T>(
    page: &mut Page,
    element: NodeId,
    event: &DomEvent,
    transport: &T,
) -> Result<Vec<Completion>, AjaxError>
where
    T: Transport + Sync,
{
    let outcome = page.dispatch_event(element, event)?;
    let mut completions = Vec::with_capacity(outcome.requests.len());
    for pending in outcome.requests {
        let completion = submit_blocking(page, pending, transport)?;
        info!(completion = ?completion_label(&completion), "ajax request finished");
        completions.push(completion);
    }
    Ok(completions)
}

fn completion_label(completion: &Completion) -> &'static str {
    match completion {
        Completion::Applied { .. } => "applied",
        Completion::Superseded => "superseded",
        Completion::Failed(_) => "failed",
    }
}
