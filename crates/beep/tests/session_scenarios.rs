use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use beep::{MemTransport, ProfileEvent, ReplyCode, SessionBuilder, SessionError, Transport};
use beep_cmp::{CmpNode, ProfileOffer};
use beep_message::{FrameKind, MessageCompiler, Mime};
use beep_wire::encode_frame;
use tokio::sync::oneshot;
use tokio::task::LocalSet;

async fn with_timeout<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut).await.expect("scenario did not complete in time")
}

/// A listener with no profiles emits exactly the unsolicited greeting RPY.
#[tokio::test(flavor = "current_thread")]
async fn greeting_with_no_profiles_matches_wire_bytes() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (session_side, observer) = MemTransport::pair();
            let session = SessionBuilder::<MemTransport>::listener().transport(session_side).build();
            session.send_greeting().await.expect("greeting sends");

            let mut buf = [0u8; 256];
            let n = with_timeout(observer.read(&mut buf)).await.expect("observer reads greeting");
            assert_eq!(
                &buf[..n],
                b"RPY 0 0 . 0 50\r\nContent-Type: application/beep+xml\r\n\r\n<greeting />END\r\n".as_slice()
            );
        })
        .await;
}

/// An installed profile is advertised in the greeting body.
#[tokio::test(flavor = "current_thread")]
async fn greeting_advertises_installed_profiles() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (session_side, observer) = MemTransport::pair();
            let session = SessionBuilder::<MemTransport>::listener()
                .transport(session_side)
                .profile("casimiro.daniel/test-profile", |_event: ProfileEvent| {})
                .build();
            session.send_greeting().await.expect("greeting sends");

            let mut buf = [0u8; 256];
            let n = with_timeout(observer.read(&mut buf)).await.expect("observer reads greeting");
            let text = String::from_utf8_lossy(&buf[..n]);
            assert!(text.starts_with("RPY 0 0 . 0 "));
            assert!(text.ends_with("<greeting><profile uri=\"casimiro.daniel/test-profile\" /></greeting>END\r\n"));
        })
        .await;
}

/// The start/close handler ordering guarantee: an initiator proposes a
/// channel for a profile the listener supports, the listener accepts, and
/// only after the positive RPY is on the wire does the listener's own
/// handler fire and make the new channel usable end-to-end.
#[tokio::test(flavor = "current_thread")]
async fn start_then_ok_opens_a_usable_channel() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (initiator_side, listener_side) = MemTransport::pair();

            let listener_started = Rc::new(RefCell::new(None));
            let listener_started_clone = listener_started.clone();
            let listener = Rc::new(
                SessionBuilder::<MemTransport>::listener()
                    .transport(listener_side)
                    .profile("x", move |event: ProfileEvent| {
                        *listener_started_clone.borrow_mut() = Some(event);
                    })
                    .build(),
            );
            let initiator = Rc::new(SessionBuilder::<MemTransport>::initiator().transport(initiator_side).build());

            listener.send_greeting().await.unwrap();
            initiator.send_greeting().await.unwrap();

            {
                let listener = listener.clone();
                tokio::task::spawn_local(async move {
                    let _ = listener.run().await;
                });
            }
            {
                let initiator = initiator.clone();
                tokio::task::spawn_local(async move {
                    let _ = initiator.run().await;
                });
            }

            let (tx, rx) = oneshot::channel();
            let channel = initiator
                .async_add_channel("x", move |result, uri| {
                    let _ = tx.send((result, uri));
                })
                .await;
            assert_eq!(channel, 1, "initiator allocates the first odd channel number");

            let (result, uri) = with_timeout(rx).await.expect("callback fires");
            assert_eq!(result.expect("start accepted"), 1);
            assert_eq!(uri, "x");

            match listener_started.borrow().as_ref().expect("listener handler fired") {
                ProfileEvent::Start { channel, peer_initiated, .. } => {
                    assert_eq!(*channel, 1);
                    assert!(*peer_initiated);
                }
                other => panic!("expected Start event, got {other:?}"),
            }
        })
        .await;
}

/// The positive reply to a `start` is a `profile` element, not `<ok />`:
/// `ok` answers a `close`, never a channel start (RFC 3080 §2.3.1.4).
#[tokio::test(flavor = "current_thread")]
async fn start_reply_is_a_profile_element_not_ok() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (session_side, observer) = MemTransport::pair();
            let listener = Rc::new(SessionBuilder::<MemTransport>::listener().transport(session_side).profile("x", |_| {}).build());
            {
                let listener = listener.clone();
                tokio::task::spawn_local(async move {
                    let _ = listener.run().await;
                });
            }

            let start = CmpNode::Start { channel: 1, server_name: None, profiles: vec![ProfileOffer::new("x")] };
            let body = beep_cmp::emit(&start);
            let frames = MessageCompiler::new().split_outgoing(0, 1, FrameKind::Msg, None, 0, &Mime::beep_xml(), body.as_bytes());
            for frame in frames {
                with_timeout(observer.write_all(&encode_frame(&frame))).await.expect("observer writes the start frame");
            }

            let mut buf = [0u8; 256];
            let n = with_timeout(observer.read(&mut buf)).await.expect("observer reads the reply");
            let text = String::from_utf8_lossy(&buf[..n]);
            assert!(text.contains("<profile uri=\"x\" />"), "expected a profile element reply, got: {text}");
            assert!(!text.contains("<ok"), "a start must never be answered with ok, got: {text}");
        })
        .await;
}

/// The peer that did not initiate the close still drives the channel out
/// of its own table and notifies the bound profile once it processes the
/// close request.
#[tokio::test(flavor = "current_thread")]
async fn close_initiated_by_peer_tears_down_the_channel_on_both_sides() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (initiator_side, listener_side) = MemTransport::pair();

            let initiator_closed = Rc::new(RefCell::new(false));
            let initiator_closed_clone = initiator_closed.clone();
            let initiator = Rc::new(
                SessionBuilder::<MemTransport>::initiator()
                    .transport(initiator_side)
                    .profile("x", move |event: ProfileEvent| {
                        if matches!(event, ProfileEvent::Close { .. }) {
                            *initiator_closed_clone.borrow_mut() = true;
                        }
                    })
                    .build(),
            );
            let listener = Rc::new(SessionBuilder::<MemTransport>::listener().transport(listener_side).profile("x", |_| {}).build());

            initiator.send_greeting().await.unwrap();
            listener.send_greeting().await.unwrap();

            {
                let initiator = initiator.clone();
                tokio::task::spawn_local(async move {
                    let _ = initiator.run().await;
                });
            }
            {
                let listener = listener.clone();
                tokio::task::spawn_local(async move {
                    let _ = listener.run().await;
                });
            }

            // The listener proposes the channel so the profile ends up bound
            // on both sides, then the *initiator* (the non-proposing peer)
            // requests the close, exercising the peer-initiated path.
            let (tx, rx) = oneshot::channel();
            listener
                .async_add_channel("x", move |result, _uri| {
                    let _ = tx.send(result);
                })
                .await;
            let opened_channel = with_timeout(rx).await.expect("start accepted").expect("channel opened");

            let (close_tx, close_rx) = oneshot::channel();
            initiator
                .async_close_channel(opened_channel, ReplyCode::Success.code(), move |result| {
                    let _ = close_tx.send(result);
                })
                .await;
            with_timeout(close_rx).await.expect("close callback fires").expect("close accepted");

            assert!(*initiator_closed.borrow(), "initiator's profile handler observed the close");
        })
        .await;
}

/// A start for a profile the listener never installed is rejected with
/// 550, and the channel never enters the table.
#[tokio::test(flavor = "current_thread")]
async fn reject_unknown_profile_leaves_channel_unopened() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (initiator_side, listener_side) = MemTransport::pair();
            let initiator = Rc::new(SessionBuilder::<MemTransport>::initiator().transport(initiator_side).profile("unknown", |_| {}).build());
            let listener = Rc::new(SessionBuilder::<MemTransport>::listener().transport(listener_side).build());

            initiator.send_greeting().await.unwrap();
            listener.send_greeting().await.unwrap();

            {
                let initiator = initiator.clone();
                tokio::task::spawn_local(async move {
                    let _ = initiator.run().await;
                });
            }
            {
                let listener = listener.clone();
                tokio::task::spawn_local(async move {
                    let _ = listener.run().await;
                });
            }

            let (tx, rx) = oneshot::channel();
            initiator
                .async_add_channel("unknown", move |result, _uri| {
                    let _ = tx.send(result);
                })
                .await;
            let result = with_timeout(rx).await.expect("callback fires");
            match result {
                Err(err) => match &*err {
                    SessionError::Protocol(protocol) => assert_eq!(protocol.code, ReplyCode::RequestedActionNotAccepted),
                    other => panic!("expected a protocol error, got {other:?}"),
                },
                Ok(channel) => panic!("expected rejection, got channel {channel}"),
            }
        })
        .await;
}

/// Also covers `UnknownProfile`: proposing a profile the caller itself never
/// installed locally is rejected before anything touches the wire.
#[tokio::test(flavor = "current_thread")]
async fn async_add_channel_rejects_locally_unknown_profile_without_any_io() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (session_side, _observer) = MemTransport::pair();
            let session = SessionBuilder::<MemTransport>::initiator().transport(session_side).build();

            let (tx, rx) = oneshot::channel();
            let channel = session
                .async_add_channel("never-installed", move |result, _uri| {
                    let _ = tx.send(result);
                })
                .await;
            assert_eq!(channel, 0);
            let result = with_timeout(rx).await.expect("callback fires immediately");
            assert!(result.is_err());
        })
        .await;
}
