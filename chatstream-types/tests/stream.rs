use chatstream_types::*;

#[test]
fn text_delta_exposes_text() {
    let event = StreamEvent::TextDelta("hello".into());
    assert_eq!(event.text(), Some("hello"));
    assert!(!event.is_terminal());
}

#[test]
fn done_maps_to_newline_marker() {
    assert_eq!(StreamEvent::Done.text(), Some(DONE_MARKER));
    assert_eq!(DONE_MARKER, "\n");
    assert!(!StreamEvent::Done.is_terminal());
}

#[test]
fn terminal_events_carry_no_text() {
    let events = [
        StreamEvent::Terminal(TerminalSignal::Completed),
        StreamEvent::Terminal(TerminalSignal::Cancelled),
        StreamEvent::Terminal(TerminalSignal::Failed(StreamError::Unknown("reset".into()))),
    ];
    for event in events {
        assert!(event.is_terminal());
        assert!(event.text().is_none());
    }
}

#[test]
fn error_kinds_match_variants() {
    assert_eq!(
        StreamError::BadEncoding("x".into()).kind(),
        ErrorKind::BadEncoding
    );
    assert_eq!(
        StreamError::BadRequest { status: 404 }.kind(),
        ErrorKind::BadRequest
    );
    assert_eq!(StreamError::Unknown("x".into()).kind(), ErrorKind::Unknown);
}

#[test]
fn bad_request_display_includes_status() {
    let err = StreamError::BadRequest { status: 429 };
    assert_eq!(err.to_string(), "bad request: HTTP 429");
}

#[test]
fn closure_observer_receives_events() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = move |event: StreamEvent| sink.lock().unwrap().push(event);

    observer.on_event(StreamEvent::TextDelta("a".into()));
    observer.on_event(StreamEvent::Done);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![StreamEvent::TextDelta("a".into()), StreamEvent::Done]
    );
}

#[tokio::test]
async fn channel_observer_forwards_events() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    tx.on_event(StreamEvent::TextDelta("hi".into()));
    tx.on_event(StreamEvent::Terminal(TerminalSignal::Completed));
    drop(tx);

    assert_eq!(rx.recv().await, Some(StreamEvent::TextDelta("hi".into())));
    assert_eq!(
        rx.recv().await,
        Some(StreamEvent::Terminal(TerminalSignal::Completed))
    );
    assert_eq!(rx.recv().await, None);
}

#[test]
fn observer_is_object_safe() {
    fn _assert_send_sync<T: Send + Sync>() {}
    _assert_send_sync::<Box<dyn StreamObserver>>();
    let _: Box<dyn StreamObserver> = Box::new(|_event: StreamEvent| {});
}
