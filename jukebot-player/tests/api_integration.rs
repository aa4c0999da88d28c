//! Integration tests for the jukebot-player HTTP API
//!
//! Exercises the session command surface end to end against scripted
//! resolver and sink doubles, using tower's oneshot so no socket is bound.

mod helpers;

use axum::http::StatusCode;
use helpers::{wait_for, FakeResolver, FakeSink};
use jukebot_common::EventBus;
use jukebot_player::api::{build_router, AppContext, SinkFactory};
use jukebot_player::playback::PlayerSettings;
use jukebot_player::sink::PlaybackSink;
use jukebot_player::SessionRegistry;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test server plus handles to its scripted collaborators
struct TestApp {
    router: axum::Router,
    registry: SessionRegistry,
    sinks: Arc<Mutex<HashMap<String, Arc<FakeSink>>>>,
}

impl TestApp {
    fn sink_for(&self, session_id: &str) -> Arc<FakeSink> {
        Arc::clone(
            self.sinks
                .lock()
                .unwrap()
                .get(session_id)
                .expect("session has no sink yet"),
        )
    }
}

fn setup(resolver: FakeResolver) -> TestApp {
    let events = EventBus::new(64);
    let registry = SessionRegistry::new(
        events.clone(),
        PlayerSettings {
            idle_timeout: Duration::from_secs(300),
            history_limit: 100,
            fallback_query: "popular music".to_string(),
        },
    );

    let sinks: Arc<Mutex<HashMap<String, Arc<FakeSink>>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink_factory: SinkFactory = {
        let sinks = Arc::clone(&sinks);
        Arc::new(move |session_id| {
            let sink = FakeSink::manual();
            sinks
                .lock()
                .unwrap()
                .insert(session_id.to_string(), Arc::clone(&sink));
            sink as Arc<dyn PlaybackSink>
        })
    };

    let ctx = AppContext {
        registry: registry.clone(),
        events,
        resolver: Arc::new(resolver),
        sink_factory,
    };

    TestApp {
        router: build_router(ctx),
        registry,
        sinks,
    }
}

/// Helper function to make HTTP requests to the test server
async fn make_request(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    use axum::body::Body;
    use http::{Method, Request};
    use tower::ServiceExt;

    let method = match method {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "DELETE" => Method::DELETE,
        _ => panic!("Unsupported method"),
    };

    let mut request = Request::builder().method(method).uri(path);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };

    (status, json_body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup(FakeResolver::new());

    let (status, body) = make_request(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "session_player");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_enqueue_creates_session_and_lists_queue() {
    let app = setup(FakeResolver::new().on_query("some song", "A"));

    let (status, body) = make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "some song"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "queued");

    assert!(app.registry.get("g1").await.is_some());

    // The loop picks the item up and starts playing it
    wait_for("A to reach the sink", || {
        app.sinks
            .lock()
            .unwrap()
            .get("g1")
            .is_some_and(|sink| sink.played_ids() == vec!["A"])
    })
    .await;

    // A second request while the first plays stays visible in the queue
    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "another song"})),
    )
    .await;

    let (status, body) = make_request(&app.router, "GET", "/sessions/g1/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    let queue = body.unwrap()["queue"].as_array().unwrap().clone();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["title"], "another song");
    assert_eq!(queue[0]["resolved"], false);
}

#[tokio::test]
async fn test_queue_of_unknown_session_is_empty() {
    let app = setup(FakeResolver::new());

    let (status, body) = make_request(&app.router, "GET", "/sessions/none/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["queue"].as_array().unwrap().len(), 0);
    // Reads never create sessions
    assert!(app.registry.get("none").await.is_none());
}

#[tokio::test]
async fn test_play_now_returns_the_resolved_track() {
    let app = setup(FakeResolver::new().on_query("urgent", "C"));

    let (status, body) = make_request(
        &app.router,
        "POST",
        "/sessions/g1/play-now",
        Some(json!({"query": "urgent"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["id"], "C");
    assert_eq!(body["title"], "Title C");

    wait_for("C to reach the sink", || {
        app.sink_for("g1").played_ids() == vec!["C"]
    })
    .await;
}

#[tokio::test]
async fn test_play_now_unresolvable_is_not_found() {
    let app = setup(FakeResolver::new());

    let (status, body) = make_request(
        &app.router,
        "POST",
        "/sessions/g1/play-now",
        Some(json!({"query": "nothing matches"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let status_text = body.unwrap()["status"].as_str().unwrap().to_string();
    assert!(status_text.contains("Resolution failed"));
}

#[tokio::test]
async fn test_autoplay_toggle_round_trip() {
    let app = setup(FakeResolver::new());

    let (status, body) =
        make_request(&app.router, "POST", "/sessions/g1/autoplay", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["enabled"], true);

    let (status, body) =
        make_request(&app.router, "POST", "/sessions/g1/autoplay", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["enabled"], false);
}

#[tokio::test]
async fn test_volume_bounds_and_echo() {
    let app = setup(FakeResolver::new());
    // Volume needs a live session
    make_request(&app.router, "POST", "/sessions/g1/autoplay", None).await;

    let (status, body) = make_request(
        &app.router,
        "POST",
        "/sessions/g1/volume",
        Some(json!({"volume": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["volume"], 42);

    for bad in [0, 101, -5] {
        let (status, body) = make_request(
            &app.router,
            "POST",
            "/sessions/g1/volume",
            Some(json!({"volume": bad})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let status_text = body.unwrap()["status"].as_str().unwrap().to_string();
        assert!(status_text.contains("between 1 and 100"));
    }

    // Boundary values are accepted
    for good in [1, 100] {
        let (status, _) = make_request(
            &app.router,
            "POST",
            "/sessions/g1/volume",
            Some(json!({"volume": good})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_commands_against_unknown_session_are_rejected() {
    let app = setup(FakeResolver::new());

    for (method, path, body) in [
        ("POST", "/sessions/none/stop", None),
        ("POST", "/sessions/none/skip", None),
        ("POST", "/sessions/none/volume", Some(json!({"volume": 50}))),
        ("POST", "/sessions/none/pause", None),
        ("POST", "/sessions/none/resume", None),
    ] {
        let (status, response) = make_request(&app.router, method, path, body).await;
        assert_eq!(status, StatusCode::CONFLICT, "{} {}", method, path);
        let status_text = response.unwrap()["status"].as_str().unwrap().to_string();
        assert!(status_text.contains("No active playback connection"));
    }
}

#[tokio::test]
async fn test_skip_with_nothing_playing() {
    let app = setup(FakeResolver::new());
    make_request(&app.router, "POST", "/sessions/g1/autoplay", None).await;

    let (status, body) = make_request(&app.router, "POST", "/sessions/g1/skip", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "nothing playing");
}

#[tokio::test]
async fn test_now_playing_reports_track_and_state() {
    let app = setup(FakeResolver::new().on_query("song", "A"));

    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "song"})),
    )
    .await;
    wait_for("A to reach the sink", || {
        app.sink_for("g1").played_ids() == vec!["A"]
    })
    .await;

    let (status, body) =
        make_request(&app.router, "GET", "/sessions/g1/now-playing", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["track"]["id"], "A");
    assert_eq!(body["state"], "playing");
    assert_eq!(body["autoplay"], false);
    assert_eq!(body["volume"], 50);
}

#[tokio::test]
async fn test_now_playing_for_unknown_session() {
    let app = setup(FakeResolver::new());

    let (status, body) =
        make_request(&app.router, "GET", "/sessions/none/now-playing", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert!(body.get("track").is_none());
    assert_eq!(body["state"], "destroyed");
}

#[tokio::test]
async fn test_stop_clears_the_queue() {
    let app = setup(
        FakeResolver::new()
            .on_query("first", "A")
            .on_query("second", "B"),
    );

    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "first"})),
    )
    .await;
    wait_for("A to reach the sink", || {
        app.sink_for("g1").played_ids() == vec!["A"]
    })
    .await;
    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "second"})),
    )
    .await;

    let (status, body) = make_request(&app.router, "POST", "/sessions/g1/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "stopped");

    let (_, body) = make_request(&app.router, "GET", "/sessions/g1/queue", None).await;
    assert_eq!(body.unwrap()["queue"].as_array().unwrap().len(), 0);
    // The session itself stays alive after stop
    assert!(app.registry.get("g1").await.is_some());
}

#[tokio::test]
async fn test_delete_destroys_the_session() {
    let app = setup(FakeResolver::new().on_query("song", "A"));

    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "song"})),
    )
    .await;
    wait_for("A to reach the sink", || {
        app.sink_for("g1").played_ids() == vec!["A"]
    })
    .await;
    let sink = app.sink_for("g1");

    let (status, _) = make_request(&app.router, "DELETE", "/sessions/g1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(app.registry.get("g1").await.is_none());
    wait_for("sink teardown", || sink.disconnect_count() == 1).await;

    // Deleting again is still 204
    let (status, _) = make_request(&app.router, "DELETE", "/sessions/g1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_sessions_do_not_share_queues() {
    let app = setup(
        FakeResolver::new()
            .on_query("for g1", "A")
            .on_query("for g2", "B"),
    );

    make_request(
        &app.router,
        "POST",
        "/sessions/g1/queue",
        Some(json!({"query": "for g1"})),
    )
    .await;
    make_request(
        &app.router,
        "POST",
        "/sessions/g2/queue",
        Some(json!({"query": "for g2"})),
    )
    .await;

    wait_for("each sink to get its own track", || {
        let sinks = app.sinks.lock().unwrap();
        sinks.get("g1").is_some_and(|s| s.played_ids() == vec!["A"])
            && sinks.get("g2").is_some_and(|s| s.played_ids() == vec!["B"])
    })
    .await;
}
