use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use jornadas_client::{
    ContentNotifier, ContentSource, HttpGateway, LikeGateway, LikeStore, NotifierConfig,
    SessionId, ToggleOutcome,
};
use jornadas_common::{BASELINE_KEY, GatewayError};
use jornadas_protocol::{DispatchRequest, EntryKind, LikeAction, LikeData, NewEntry, ToggleRequest};
use jornadas_server::{AppState, DispatchHub, serve};
use jornadas_storage::{FileDocumentStore, LocalStore, MemoryStore, TtlCache};

const TOKEN: &str = "segredo-de-teste";

struct TestServer {
    url: String,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap();
    }
}

/// Gateway real numa porta efémera.
async fn start_server(state: AppState) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn({
        let state = state.clone();
        async move {
            serve(listener, state, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        }
    });

    TestServer {
        url: format!("http://{addr}"),
        state,
        shutdown: Some(tx),
        handle,
    }
}

fn testimonial(name: &str) -> NewEntry {
    NewEntry {
        kind: EntryKind::Testimonial,
        display_name: name.into(),
        content: Some("Gostei muito".into()),
        image_url: None,
    }
}

#[tokio::test]
async fn test_health() {
    let server = start_server(AppState::in_memory()).await;
    let gateway = HttpGateway::new(&server.url).unwrap();
    gateway.health().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_like_roundtrip_between_sessions() {
    let server = start_server(AppState::in_memory()).await;
    let gateway = HttpGateway::new(&server.url).unwrap();
    let a = SessionId::new("client_1_aaaaaaaaa");
    let b = SessionId::new("client_1_bbbbbbbbb");

    let response = gateway
        .toggle_like(&ToggleRequest {
            entry_id: "foto 1/x".into(),
            session_id: a.as_str().into(),
            action: LikeAction::Like,
        })
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.data(), LikeData::new(true, 1));

    assert_eq!(
        gateway.like_data("foto 1/x", &a).await.unwrap(),
        LikeData::new(true, 1)
    );
    assert_eq!(
        gateway.like_data("foto 1/x", &b).await.unwrap(),
        LikeData::new(false, 1)
    );
    assert_eq!(server.state.counters.total("foto 1/x"), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_controller_against_real_gateway() {
    let server = start_server(AppState::in_memory()).await;
    let gateway = Arc::new(HttpGateway::new(&server.url).unwrap());
    let store = LikeStore::new(gateway, TtlCache::new(None));
    let controller = store.controller("foto-7", SessionId::new("client_1_ccccccccc"));

    controller.load().await;
    assert_eq!(controller.view().data(), LikeData::new(false, 0));

    let outcome = controller.toggle().await;
    assert_eq!(outcome, ToggleOutcome::Applied(LikeData::new(true, 1)));

    let view = controller.refresh().await;
    assert_eq!(view.data(), LikeData::new(true, 1));
    server.stop().await;
}

#[tokio::test]
async fn test_community_lifecycle_with_file_document() {
    let dir = tempfile::tempdir().unwrap();
    let documents = Arc::new(FileDocumentStore::new(dir.path().join("community.json")));
    let state = AppState::new(documents, DispatchHub::default()).with_admin_token(TOKEN);
    let mut events = state.dispatch.subscribe();
    let server = start_server(state).await;

    let public = HttpGateway::new(&server.url).unwrap();
    let admin = public.clone().with_admin_token(TOKEN);

    // Sem documento ainda: listagem vazia
    assert_eq!(public.content().await.unwrap().total(), 0);

    let first = admin.append_entry(&testimonial("Ana")).await.unwrap();
    let second = admin.append_entry(&testimonial("Rui")).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(events.recv().await.unwrap().event_type, "content-updated");

    let listing = public.content().await.unwrap();
    assert_eq!(listing.total(), 2);
    assert!(dir.path().join("community.json").exists());

    admin.remove_entry(&first.id).await.unwrap();
    let err = admin.remove_entry(&first.id).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 404, .. }));

    let listing = public.content().await.unwrap();
    assert_eq!(listing.total(), 1);
    assert_eq!(listing.entries[0].id, second.id);
    server.stop().await;
}

#[tokio::test]
async fn test_admin_token_is_checked() {
    let server = start_server(AppState::in_memory().with_admin_token(TOKEN)).await;
    let wrong = HttpGateway::new(&server.url)
        .unwrap()
        .with_admin_token("outro");

    let err = wrong.append_entry(&testimonial("Ana")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized(_)));

    let err = wrong
        .dispatch(&DispatchRequest {
            event_type: "process-image".into(),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized(_)));
    server.stop().await;
}

#[tokio::test]
async fn test_dispatch_delivers_to_subscribers() {
    let state = AppState::in_memory().with_admin_token(TOKEN);
    let mut rx = state.dispatch.subscribe();
    let server = start_server(state).await;
    let admin = HttpGateway::new(&server.url)
        .unwrap()
        .with_admin_token(TOKEN);

    let ack = admin
        .dispatch(&DispatchRequest {
            event_type: "process-image".into(),
            payload: serde_json::json!({"id": "e1"}),
        })
        .await
        .unwrap();
    assert_eq!(ack.delivered, 1);
    assert_eq!(rx.recv().await.unwrap().payload["id"], "e1");
    server.stop().await;
}

#[tokio::test]
async fn test_notifier_sees_new_content() {
    let server = start_server(AppState::in_memory().with_admin_token(TOKEN)).await;
    let admin = Arc::new(
        HttpGateway::new(&server.url)
            .unwrap()
            .with_admin_token(TOKEN),
    );
    let local = Arc::new(MemoryStore::new());
    local.set(BASELINE_KEY, "0").unwrap();
    let notifier = ContentNotifier::new(admin.clone(), local.clone(), NotifierConfig::default());

    assert!(!notifier.check_for_new().await.unwrap().has_new_items);

    admin.append_entry(&testimonial("Ana")).await.unwrap();
    admin.append_entry(&testimonial("Rui")).await.unwrap();
    let state = notifier.check_for_new().await.unwrap();
    assert!(state.has_new_items);
    assert_eq!(state.new_count, 2);

    notifier.mark_as_viewed().await.unwrap();
    assert_eq!(local.get(BASELINE_KEY).as_deref(), Some("2"));
    server.stop().await;
}
