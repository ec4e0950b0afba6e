mod common;

use common::{RecordingHost, Write, DOC};
use ollama_assist::provider::stub::{StubProvider, StubStep};
use ollama_assist::provider::GenerateRequest;
use ollama_assist::{
    CancelOutcome, Controller, RequestRegistry, RequestState, UiContext, UiEvent, UiQueue,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn chunk(s: &str) -> StubStep {
    StubStep::Chunk(s.to_string())
}

fn delay(ms: u64) -> StubStep {
    StubStep::Delay(Duration::from_millis(ms))
}

fn request(model: &str) -> GenerateRequest {
    GenerateRequest::new("http://unused", model, "", "question", "context")
}

fn controller(stub: &StubProvider) -> (Controller, UiContext) {
    let (queue, ui) = UiQueue::channel();
    let controller = Controller::new(
        Arc::new(stub.clone()),
        Arc::new(RequestRegistry::new()),
        queue,
        tokio::runtime::Handle::current(),
    );
    (controller, ui)
}

#[tokio::test]
async fn fragments_arrive_in_order_at_the_cursor() {
    let stub = StubProvider::scripted(vec![chunk("Hel"), delay(5), chunk("lo"), chunk(" world")]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::with_document("ctx ");

    let handle = controller.submit(request("llama3"), DOC);
    let outcome = ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(outcome, Some(ollama_assist::Outcome::Completed));
    assert_eq!(handle.wait().await, RequestState::Completed);
    assert_eq!(
        host.writes,
        vec![
            Write::Document("Hel".into()),
            Write::Document("lo".into()),
            Write::Document(" world".into()),
        ]
    );
    assert_eq!(host.document.text(), "ctx Hello world");
    assert_eq!(host.status_sets, 1);
    assert_eq!(host.status_clears, 1);
    assert!(host.errors.is_empty());
    assert!(controller.registry().current().is_none());
    assert_eq!(stub.releases(), 1);
}

#[tokio::test]
async fn visible_panel_receives_the_text() {
    let stub = StubProvider::scripted(vec![chunk("a"), chunk("b")]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::with_document("untouched");
    host.panel_visible = true;

    let handle = controller.submit(request("m"), DOC);
    ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(host.writes, vec![Write::Panel("a".into()), Write::Panel("b".into())]);
    assert_eq!(host.document.text(), "untouched");
}

#[tokio::test]
async fn status_names_the_model() {
    let stub = StubProvider::scripted(vec![delay(200)]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("mistral"), DOC);
    match ui.next().await {
        Some(event @ UiEvent::Started { .. }) => ollama_assist::ui::dispatch(&mut host, event),
        other => panic!("expected Started, got {other:?}"),
    }
    assert_eq!(
        host.status.as_deref(),
        Some("Ollama: Generating response with mistral... (Press Ctrl+K to cancel)")
    );

    handle.cancel();
    ui.run_until_finished(&mut host, handle.id()).await;
    assert_eq!(host.status, None);
}

#[tokio::test]
async fn cancel_without_a_request_does_nothing() {
    let stub = StubProvider::new();
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    assert_eq!(controller.registry().cancel_current(), CancelOutcome::NothingToCancel);
    assert_eq!(ui.drain(&mut host), 0);
    assert!(host.errors.is_empty());
}

#[tokio::test]
async fn cancel_mid_stream_stops_delivery_quietly() {
    let stub = StubProvider::scripted(vec![chunk("first"), delay(5_000), chunk("second")]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("m"), DOC);
    loop {
        let event = ui.next().await.expect("queue open");
        let fragment = matches!(event, UiEvent::Fragment { .. });
        ollama_assist::ui::dispatch(&mut host, event);
        if fragment {
            break;
        }
    }
    assert_eq!(handle.state(), RequestState::Streaming);

    let id = handle.id();
    assert_eq!(controller.registry().cancel_current(), CancelOutcome::Cancelled(id));

    let state = tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("cancellation takes effect before the next chunk");
    assert_eq!(state, RequestState::Cancelled);

    ui.drain(&mut host);
    assert_eq!(host.written(), vec!["first"]);
    assert!(host.errors.is_empty());
    assert_eq!(host.status_clears, 1);
    assert_eq!(stub.releases(), 1);
    assert!(controller.registry().current().is_none());

    // A finished request is gone from the slot.
    assert_eq!(controller.registry().cancel_current(), CancelOutcome::NothingToCancel);
}

#[tokio::test]
async fn cancelling_twice_is_harmless() {
    let stub = StubProvider::scripted(vec![delay(5_000)]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("m"), DOC);
    handle.cancel();
    handle.cancel();
    assert_eq!(handle.wait().await, RequestState::Cancelled);

    ui.drain(&mut host);
    assert_eq!(host.status_clears, 1);
    assert!(host.errors.is_empty());
}

#[tokio::test]
async fn unreachable_server_reports_once() {
    let stub = StubProvider::unreachable("connection refused");
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("m"), DOC);
    ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(host.errors, vec!["Error making request: connection refused"]);
    assert_eq!(host.status_sets, 1);
    assert_eq!(host.status_clears, 1);
    assert!(host.writes.is_empty());
    assert_eq!(handle.wait().await, RequestState::Failed("connection refused".into()));
    assert!(controller.registry().current().is_none());
}

#[tokio::test]
async fn mid_stream_failure_keeps_earlier_text() {
    let stub = StubProvider::scripted(vec![chunk("partial"), StubStep::Fail("stream broke".into())]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("m"), DOC);
    ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(host.written(), vec!["partial"]);
    assert_eq!(host.errors, vec!["Error making request: stream broke"]);
    assert_eq!(host.status_clears, 1);
    assert_eq!(stub.releases(), 1);
}

#[tokio::test]
async fn missing_model_fails_before_any_traffic() {
    let stub = StubProvider::scripted(vec![chunk("never")]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let handle = controller.submit(request(" "), DOC);
    ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(host.errors, vec!["Error making request: no model selected"]);
    assert!(host.writes.is_empty());
    assert_eq!(stub.releases(), 0);
}

#[tokio::test]
async fn superseded_request_keeps_running_but_cannot_be_cancelled() {
    let stub = StubProvider::scripted(vec![delay(50), chunk("x")]);
    let (controller, mut ui) = controller(&stub);
    let mut host = RecordingHost::new();

    let first = controller.submit(request("m"), DOC);
    let second = controller.submit(request("m"), DOC);

    assert_eq!(
        controller.registry().cancel_current(),
        CancelOutcome::Cancelled(second.id())
    );
    assert_eq!(first.wait().await, RequestState::Completed);
    assert_eq!(second.wait().await, RequestState::Cancelled);

    ui.drain(&mut host);
    assert_eq!(host.written(), vec!["x"]);
    assert_eq!(host.status_clears, 2);
    assert!(host.errors.is_empty());
}

#[derive(Debug)]
struct Run {
    state: RequestState,
    written: Vec<String>,
    errors: usize,
    status_sets: usize,
    status_clears: usize,
    releases: usize,
    slot_empty: bool,
}

fn run_case(chunks: &[String], pauses: &[u64], fail: bool, cancel_after: Option<u64>) -> Run {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async {
        let mut script = Vec::new();
        for (text, pause) in chunks.iter().zip(pauses) {
            script.push(delay(*pause));
            script.push(chunk(text));
        }
        if fail {
            script.push(StubStep::Fail("boom".into()));
        }
        let stub = StubProvider::scripted(script);
        let (controller, mut ui) = controller(&stub);
        let mut host = RecordingHost::new();

        let handle = controller.submit(request("m"), DOC);
        if let Some(ms) = cancel_after {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            controller.registry().cancel_current();
        }
        let state = handle.wait().await;
        ui.drain(&mut host);

        Run {
            state,
            written: host.written(),
            errors: host.errors.len(),
            status_sets: host.status_sets,
            status_clears: host.status_clears,
            releases: stub.releases(),
            slot_empty: controller.registry().current().is_none(),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn every_request_ends_exactly_once(
        chunks in prop::collection::vec("[a-z]{1,4}", 0..6),
        pauses in prop::collection::vec(0u64..4, 6),
        fail in any::<bool>(),
        cancel_after in prop::option::of(0u64..12),
    ) {
        let run = run_case(&chunks, &pauses, fail, cancel_after);

        prop_assert!(run.state.is_terminal());
        prop_assert_eq!(run.status_sets, 1);
        prop_assert_eq!(run.status_clears, 1);
        prop_assert!(run.slot_empty);
        prop_assert!(run.releases <= 1);
        prop_assert!(chunks.starts_with(&run.written), "{:?} vs {:?}", run.written, chunks);

        match &run.state {
            RequestState::Completed => {
                // A late cancel can still drop queued fragments.
                if cancel_after.is_none() {
                    prop_assert_eq!(&run.written, &chunks);
                }
                prop_assert_eq!(run.errors, 0);
                prop_assert_eq!(run.releases, 1);
            }
            RequestState::Failed(msg) => {
                prop_assert!(fail);
                prop_assert_eq!(msg.as_str(), "boom");
                prop_assert_eq!(run.errors, 1);
                prop_assert_eq!(run.releases, 1);
            }
            RequestState::Cancelled => {
                prop_assert!(cancel_after.is_some());
                prop_assert_eq!(run.errors, 0);
            }
            other => prop_assert!(false, "non-terminal state {:?}", other),
        }
    }
}

/// Provider whose generation future panics when polled.
struct Panicking;

impl ollama_assist::provider::Provider for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn list_models(
        &self,
        _base_url: &str,
    ) -> ollama_assist::provider::ProviderFuture<Vec<String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn generate(
        &self,
        _req: GenerateRequest,
    ) -> ollama_assist::provider::ProviderFuture<ollama_assist::provider::Fragments> {
        Box::pin(async { panic!("provider bug") })
    }
}

#[tokio::test]
async fn crashed_worker_is_reported_as_failure() {
    let (queue, mut ui) = UiQueue::channel();
    let controller = Controller::new(
        Arc::new(Panicking),
        Arc::new(RequestRegistry::new()),
        queue,
        tokio::runtime::Handle::current(),
    );
    let mut host = RecordingHost::new();

    let handle = controller.submit(request("m"), DOC);
    ui.run_until_finished(&mut host, handle.id()).await;

    assert_eq!(host.errors, vec!["Error making request: worker aborted"]);
    assert_eq!(host.status_clears, 1);
    assert_eq!(handle.wait().await, RequestState::Failed("worker aborted".into()));
    assert!(controller.registry().current().is_none());
}
