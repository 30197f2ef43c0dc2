// Wire-format compatibility: the session gateway and the edge device must
// never disagree on these shapes, so lock them down with integration tests
// rather than relying on the inline unit tests alone.

use skynet_protocol::dispatch::{QueueJob, WakeInjection, WakeReason, WakeSignal};
use skynet_protocol::frames::{ClientFrame, ParsedClientFrame, ServerFrame};

#[test]
fn client_audio_frame_round_trips() {
    let json = r#"{"audio":"Ym9keQ=="}"#;
    let frame = ClientFrame::parse(json).unwrap();
    match frame.classify() {
        ParsedClientFrame::Audio(b) => assert_eq!(b, "Ym9keQ=="),
        other => panic!("expected audio, got {other:?}"),
    }
}

#[test]
fn client_input_text_is_recognized_as_text() {
    let frame = ClientFrame::parse(r#"{"input_text":"what's on my list"}"#).unwrap();
    match frame.classify() {
        ParsedClientFrame::Text(t) => assert_eq!(t, "what's on my list"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn server_end_conversation_is_terminal_marker() {
    let json = ServerFrame::end_conversation().to_json().unwrap();
    assert_eq!(json, r#"{"end_conversation":true}"#);
}

#[test]
fn wake_signal_round_trips_through_json() {
    let signal = WakeSignal::new(
        WakeReason::TextMessage,
        "u-42",
        serde_json::json!({"chat_id": "c-1"}),
    );
    let json = serde_json::to_string(&signal).unwrap();
    let back: WakeSignal = serde_json::from_str(&json).unwrap();
    assert_eq!(back.reason, WakeReason::TextMessage);
    assert_eq!(back.user_id, "u-42");
}

#[test]
fn queue_job_task_and_text_message_shapes_match_spec() {
    let task_job = serde_json::to_value(QueueJob::task("t1", "u1", "Title", "Desc")).unwrap();
    assert_eq!(task_job["pending_task"], true);
    assert!(task_job.get("pending_message").is_none());

    let msg_job = serde_json::to_value(QueueJob::text_message("u1", "c1", Some("m1".into()))).unwrap();
    assert_eq!(msg_job["pending_task"], false);
    assert_eq!(msg_job["pending_message"], true);
    assert_eq!(msg_job["message_type"], "text_message");
}

#[test]
fn device_resends_wake_injection_as_turns_envelope() {
    let raw = r#"{"turns":{"command":"start_websocket","reason":"text_message","pending_messages":true,"user_id":"u1","chat_id":"c1"},"turn_complete":true}"#;
    let frame = ClientFrame::parse(raw).unwrap();
    match frame.classify() {
        ParsedClientFrame::WakeInjection(w) => {
            assert_eq!(w.reason, WakeReason::TextMessage);
            assert_eq!(w.user_id, "u1");
        }
        other => panic!("expected wake injection, got {other:?}"),
    }

    assert!(WakeInjection::from_value(&serde_json::json!({"command":"not_it"})).is_none());
}
