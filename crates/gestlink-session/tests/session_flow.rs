//! 라이브 세션 흐름 통합 테스트 (루프백 전송 + 일시정지 시계).

mod common;

use common::{fist, settle, test_config, Recorder, StaticCamera};
use gestlink_core::models::gesture::{ActionKind, GestureKind};
use gestlink_core::models::session::{SessionState, TransportState};
use gestlink_core::ports::camera::{CameraSource, NoCamera};
use gestlink_network::loopback::LoopbackConnector;
use gestlink_session::{SessionController, SessionRuntime};
use std::sync::Arc;
use std::time::Duration;

fn spawn_session(
    connector: &LoopbackConnector,
    camera: Box<dyn CameraSource>,
) -> (SessionController, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let controller = SessionRuntime::new(test_config(), Arc::new(connector.clone()), camera)
        .with_consumer(recorder.clone())
        .spawn();
    (controller, recorder)
}

#[tokio::test(start_paused = true)]
async fn start_twice_opens_one_transport() {
    let connector = LoopbackConnector::new();
    let (controller, _recorder) = spawn_session(&connector, Box::new(StaticCamera));

    assert!(controller.start().await.unwrap());
    assert!(!controller.start().await.unwrap());
    settle().await;
    assert!(!controller.start().await.unwrap());

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(
        connector.last_peer().unwrap().url(),
        "ws://localhost:8000/ws/gestures"
    );
}

#[tokio::test(start_paused = true)]
async fn unchanged_reading_is_not_delivered_twice() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    settle().await;

    let peer = connector.last_peer().unwrap();
    peer.push(fist(true));
    peer.push(fist(false));
    settle().await;

    let events = recorder.events.lock().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), ActionKind::LeftClick);
    assert_eq!(events[0].confidence(), 0.88);

    // 표시 상태는 변경 여부와 무관하게 갱신된다
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.current_gesture, Some(GestureKind::Fist));
    assert_eq!(snapshot.last_stable, Some(GestureKind::Fist));
}

#[tokio::test(start_paused = true)]
async fn delivered_events_equal_changed_messages() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    let messages = [
        (r#"{"gesture":"open_hand","confidence":0.71,"stable":true,"gesture_changed":true}"#, true),
        (r#"{"gesture":"open_hand","confidence":0.74,"stable":true,"gesture_changed":false}"#, false),
        (r#"{"gesture":"pinch","confidence":0.66,"stable":false,"gesture_changed":false}"#, false),
        (r#"{"gesture":"pinch","confidence":0.69,"stable":true,"gesture_changed":true}"#, true),
        (r#"{"gesture":"none","action":"none","confidence":0.0,"hands_detected":0}"#, false),
        (r#"{"gesture":"index_point","confidence":0.9,"stable":true,"gesture_changed":true,"details":{"cursor_x":0.4,"cursor_y":0.6}}"#, true),
    ];
    let peer = connector.last_peer().unwrap();
    for (raw, _) in &messages {
        peer.push(*raw);
    }
    settle().await;

    let expected = messages.iter().filter(|(_, changed)| *changed).count();
    let events = recorder.events.lock().clone();
    assert_eq!(events.len(), expected);
    assert_eq!(
        events.iter().map(|e| e.gesture()).collect::<Vec<_>>(),
        vec![GestureKind::OpenHand, GestureKind::Pinch, GestureKind::IndexPoint]
    );
    assert_eq!(events[2].reading.details["cursor_x"], 0.4);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_confidence_is_decode_error() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    let peer = connector.last_peer().unwrap();
    peer.push(
        r#"{"gesture":"fist","action":"left_click","confidence":1.3,"stable":true,"gesture_changed":true}"#,
    );
    peer.push("garbage");
    peer.push(fist(true));
    settle().await;

    // 잘못된 메시지는 폐기되고 세션은 계속된다
    assert_eq!(recorder.event_count(), 1);
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.decode_errors, 2);
    assert_eq!(snapshot.session, SessionState::Active);
    assert_eq!(snapshot.transport, TransportState::Open);
    assert!(recorder
        .notice_messages()
        .iter()
        .any(|m| m.contains("1.3")));
}

#[tokio::test(start_paused = true)]
async fn non_utf8_binary_message_counts_as_decode_error() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    let peer = connector.last_peer().unwrap();
    peer.push_binary(vec![b'{', 0xFF, 0xFE, b'}']);
    peer.push_binary(fist(true).into_bytes());
    settle().await;

    assert_eq!(recorder.event_count(), 1);
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.decode_errors, 1);
    assert_eq!(snapshot.current_gesture, Some(GestureKind::Fist));
    assert!(recorder
        .notice_messages()
        .iter()
        .any(|m| m.contains("UTF-8")));
}

#[tokio::test(start_paused = true)]
async fn server_error_reply_is_notice_not_event() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    connector
        .last_peer()
        .unwrap()
        .push(r#"{"error":"Invalid image data"}"#);
    settle().await;

    assert_eq!(recorder.event_count(), 0);
    assert!(recorder
        .notice_messages()
        .iter()
        .any(|m| m.contains("Invalid image data")));
    assert_eq!(controller.snapshot().await.unwrap().decode_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn nothing_observable_after_stop() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    let peer = connector.last_peer().unwrap();
    assert!(peer.sent_count() > 0);
    assert_eq!(recorder.metrics_count(), 1);

    // 버퍼에 남은 수신 메시지
    peer.push(fist(true));
    peer.push(fist(true));
    assert!(controller.stop().await.unwrap());

    let sent_at_stop = peer.sent_count();
    let metrics_at_stop = recorder.metrics_count();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.event_count(), 0);
    assert_eq!(peer.sent_count(), sent_at_stop);
    assert_eq!(recorder.metrics_count(), metrics_at_stop);
    assert!(peer.is_closed());

    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.session, SessionState::Idle);
    assert_eq!(snapshot.transport, TransportState::Closed);
    assert_eq!(snapshot.current_gesture, None);
}

#[tokio::test(start_paused = true)]
async fn profile_change_reopens_scoped_transport() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;

    let old_peer = connector.last_peer().unwrap();
    let sent_on_old = old_peer.sent_count();
    assert!(sent_on_old > 0);

    assert!(controller
        .set_profile(Some("abc123".to_string()))
        .await
        .unwrap());
    assert!(old_peer.is_closed());

    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(connector.connect_count(), 2);
    let new_peer = connector.last_peer().unwrap();
    assert_eq!(
        new_peer.url(),
        "ws://localhost:8000/ws/gestures?profile_id=abc123"
    );
    assert!(new_peer.sent_count() > 0);
    assert_eq!(old_peer.sent_count(), sent_on_old);

    assert_eq!(
        recorder.connections(),
        vec![
            TransportState::Connecting,
            TransportState::Open,
            TransportState::Closed,
            TransportState::Connecting,
            TransportState::Open,
        ]
    );

    // 같은 범위로 다시 설정하면 아무 일도 없다
    assert!(!controller
        .set_profile(Some("abc123".to_string()))
        .await
        .unwrap());
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn profile_change_after_drop_reports_each_state_once() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    connector.last_peer().unwrap().fail("connection reset");
    settle().await;
    controller
        .set_profile(Some("abc123".to_string()))
        .await
        .unwrap();
    settle().await;

    connector.last_peer().unwrap().close_remote();
    settle().await;
    controller.set_profile(None).await.unwrap();
    settle().await;

    // 이미 끊긴 전송을 닫을 때는 상태 알림이 없다
    assert_eq!(
        recorder.connections(),
        vec![
            TransportState::Connecting,
            TransportState::Open,
            TransportState::Disconnected,
            TransportState::Connecting,
            TransportState::Open,
            TransportState::Closed,
            TransportState::Connecting,
            TransportState::Open,
        ]
    );
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.profile_scope, None);
    assert_eq!(snapshot.transport, TransportState::Open);
    assert_eq!(connector.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn profile_set_while_idle_applies_on_start() {
    let connector = LoopbackConnector::new();
    let (controller, _recorder) = spawn_session(&connector, Box::new(NoCamera));

    assert!(controller.set_profile(Some("xyz".to_string())).await.unwrap());
    assert_eq!(connector.connect_count(), 0);

    controller.start().await.unwrap();
    settle().await;
    assert_eq!(
        connector.last_peer().unwrap().url(),
        "ws://localhost:8000/ws/gestures?profile_id=xyz"
    );
}

#[tokio::test(start_paused = true)]
async fn fps_counts_sent_frames_only() {
    let connector = LoopbackConnector::new();
    connector.set_refuse(true);
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    // 프레임은 캡처되지만 전송이 열리지 않아 모두 폐기된다
    assert_eq!(recorder.last_metrics().unwrap().fps, 0);
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.transport, TransportState::Disconnected);
    assert_eq!(snapshot.session, SessionState::Active);
    assert_eq!(snapshot.frames_sent, 0);
    assert_eq!(
        recorder.connections(),
        vec![TransportState::Connecting, TransportState::Disconnected]
    );
}

#[tokio::test(start_paused = true)]
async fn fps_and_latency_with_responding_backend() {
    let connector = LoopbackConnector::new().with_responder(|_| {
        Some(r#"{"gesture":"none","action":"none","confidence":0.0,"hands_detected":0}"#.to_string())
    });
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    let metrics = recorder.last_metrics().unwrap();
    assert!((9..=10).contains(&metrics.fps), "fps = {}", metrics.fps);
    assert!(metrics.latency_ms.is_some());
    assert_eq!(recorder.event_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_camera_reports_degraded_capture() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_050)).await;

    assert!(recorder.metrics.lock().iter().all(|m| m.fps == 0));
    let degraded_notices = recorder
        .notice_messages()
        .iter()
        .filter(|m| m.contains("저하"))
        .count();
    assert_eq!(degraded_notices, 1);
    assert_eq!(connector.last_peer().unwrap().sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_close_needs_explicit_restart() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(StaticCamera));
    controller.start().await.unwrap();
    settle().await;

    connector.last_peer().unwrap().close_remote();
    tokio::time::sleep(Duration::from_secs(3)).await;

    // 자동 재연결 없음, 세션은 Active 유지
    assert_eq!(connector.connect_count(), 1);
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.session, SessionState::Active);
    assert_eq!(snapshot.transport, TransportState::Closed);
    assert_eq!(recorder.last_metrics().unwrap().fps, 0);
    assert!(!controller.start().await.unwrap());

    controller.stop().await.unwrap();
    controller.start().await.unwrap();
    settle().await;
    assert_eq!(connector.connect_count(), 2);
    assert_eq!(
        controller.snapshot().await.unwrap().transport,
        TransportState::Open
    );
}

#[tokio::test(start_paused = true)]
async fn transport_error_surfaces_disconnected() {
    let connector = LoopbackConnector::new();
    let (controller, recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;

    connector.last_peer().unwrap().fail("connection reset");
    settle().await;

    assert_eq!(
        recorder.connections().last(),
        Some(&TransportState::Disconnected)
    );
    assert!(recorder
        .notice_messages()
        .iter()
        .any(|m| m.contains("connection reset")));
    assert_eq!(
        controller.snapshot().await.unwrap().session,
        SessionState::Active
    );
}

#[tokio::test(start_paused = true)]
async fn restart_clears_display_state() {
    let connector = LoopbackConnector::new();
    let (controller, _recorder) = spawn_session(&connector, Box::new(NoCamera));
    controller.start().await.unwrap();
    settle().await;
    connector.last_peer().unwrap().push(fist(true));
    settle().await;
    assert_eq!(
        controller.snapshot().await.unwrap().current_gesture,
        Some(GestureKind::Fist)
    );

    controller.stop().await.unwrap();
    controller.start().await.unwrap();
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.current_gesture, None);
    assert_eq!(snapshot.current_confidence, None);
}
