//! End-to-end call flows over an in-memory signaling pipe.

mod common;

use common::{harness, harness_with, wait_until};
use qafila_call::calls::{CallConfig, EndReason};
use qafila_call::client::ClientConfig;
use qafila_call::signaling::{CallEndSignal, CallSignal, SignalEvent};
use qafila_call::types::{PartyRole, RemoteParty};
use std::sync::atomic::Ordering;

fn guide() -> RemoteParty {
    RemoteParty::new("guide-1", "Omar", PartyRole::Guide)
}

fn offer_from(remote: &RemoteParty) -> SignalEvent {
    SignalEvent::CallOffer(CallSignal {
        remote_party: remote.clone(),
        payload: "their-offer".into(),
    })
}

#[tokio::test]
async fn connect_registers_then_subscribes() {
    let h = harness();
    let pipe = h.start().await;

    // Register plus the three relay subscriptions.
    wait_until(|| async { pipe.sent_events().await.len() >= 4 }).await;
    let sent = pipe.sent_events().await;
    match &sent[0] {
        SignalEvent::Register(frame) => assert_eq!(frame.user_id, "u1"),
        other => panic!("first frame should be register, got {other:?}"),
    }
    assert!(
        sent[1..]
            .iter()
            .all(|e| matches!(e, SignalEvent::Subscribe(_)))
    );
}

#[tokio::test]
async fn outgoing_call_connects_on_remote_answer() {
    let h = harness();
    let pipe = h.start().await;

    h.client.start_call(guide()).await.unwrap();
    assert!(h.client.manager.phase().await.is_dialing());
    assert!(
        pipe.sent_events()
            .await
            .iter()
            .any(|e| matches!(e, SignalEvent::CallOffer(_)))
    );

    pipe.inject(&SignalEvent::CallAnswer(CallSignal {
        remote_party: guide(),
        payload: "their-answer".into(),
    }))
    .await;
    wait_until(|| async { h.client.manager.phase().await.is_connected() }).await;

    pipe.inject(&SignalEvent::CallEnd(CallEndSignal {
        remote_party: guide(),
        reason: EndReason::Hangup,
    }))
    .await;
    wait_until(|| async { h.client.manager.is_idle().await }).await;
}

#[tokio::test]
async fn dial_deadline_cancels_and_notifies_callee() {
    let h = harness_with(ClientConfig {
        call: CallConfig {
            dial_timeout_secs: 1,
            ..CallConfig::default()
        },
        ..ClientConfig::new("u1")
    });
    let pipe = h.start().await;

    h.client.start_call(guide()).await.unwrap();
    wait_until(|| async { h.client.manager.is_idle().await }).await;

    let cancelled = pipe.sent_events().await.into_iter().any(|e| {
        matches!(
            e,
            SignalEvent::CallEnd(CallEndSignal {
                reason: EndReason::Cancel,
                ..
            })
        )
    });
    assert!(cancelled, "callee was never told to stop ringing");
    assert_eq!(
        h.client.manager.status().await.as_deref(),
        Some("remote party is unreachable")
    );
}

#[tokio::test]
async fn dialing_survives_a_down_socket_until_the_deadline() {
    let h = harness_with(ClientConfig {
        call: CallConfig {
            dial_timeout_secs: 1,
            ..CallConfig::default()
        },
        ..ClientConfig::new("u1")
    });

    // Dial before the channel has ever connected. The offer cannot be sent,
    // but the session keeps ringing out rather than collapsing to idle.
    h.client.start_call(guide()).await.unwrap();
    assert!(h.client.manager.phase().await.is_dialing());

    // The dial deadline, not the publish failure, ends the call.
    wait_until(|| async { h.client.manager.is_idle().await }).await;
    assert_eq!(
        h.client.manager.status().await.as_deref(),
        Some("remote party is unreachable")
    );
}

#[tokio::test]
async fn offer_dialed_while_offline_flushes_on_connect() {
    let h = harness();

    h.client.start_call(guide()).await.unwrap();
    assert!(h.client.manager.phase().await.is_dialing());

    let pipe = h.start().await;
    wait_until(|| async {
        pipe.sent_events()
            .await
            .iter()
            .any(|e| matches!(e, SignalEvent::CallOffer(_)))
    })
    .await;
    assert!(h.client.manager.phase().await.is_dialing());
}

#[tokio::test]
async fn incoming_offer_rings_then_answers() {
    let h = harness();
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;
    assert_eq!(h.surface.shown.load(Ordering::SeqCst), 1);
    assert_eq!(h.media.acquired(), 0, "ringing must not touch the microphone");

    h.client.answer_call().await.unwrap();
    assert!(h.client.manager.phase().await.is_connected());
    assert_eq!(h.media.acquired(), 1);
    assert!(
        pipe.sent_events()
            .await
            .iter()
            .any(|e| matches!(e, SignalEvent::CallAnswer(_)))
    );
}

#[tokio::test]
async fn declining_reports_history_and_resets() {
    let h = harness();
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;

    h.client.decline_call().await.unwrap();
    assert!(h.client.manager.is_idle().await);
    wait_until(|| async { h.history.declines.lock().unwrap().contains(&"guide-1".to_string()) })
        .await;

    let declined = pipe.sent_events().await.into_iter().any(|e| {
        matches!(
            e,
            SignalEvent::CallEnd(CallEndSignal {
                reason: EndReason::Decline,
                ..
            })
        )
    });
    assert!(declined);
}

#[tokio::test]
async fn busy_device_rejects_a_second_offer() {
    let h = harness();
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;

    let second = RemoteParty::new("pilgrim-9", "Sami", PartyRole::Pilgrim);
    pipe.inject(&offer_from(&second)).await;

    wait_until(|| async {
        pipe.sent_events().await.into_iter().any(|e| {
            matches!(
                &e,
                SignalEvent::CallEnd(CallEndSignal {
                    remote_party,
                    reason: EndReason::Busy,
                }) if remote_party.id == "pilgrim-9"
            )
        })
    })
    .await;

    // The first call still rings, untouched.
    assert!(h.client.manager.phase().await.is_ringing());
    assert_eq!(h.client.manager.snapshot().await.remote_party.unwrap().id, "guide-1");
}

#[tokio::test]
async fn remote_cancel_while_ringing_clears_the_notification() {
    let h = harness();
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;

    pipe.inject(&SignalEvent::CallEnd(CallEndSignal {
        remote_party: guide(),
        reason: EndReason::Cancel,
    }))
    .await;
    wait_until(|| async { h.client.manager.is_idle().await }).await;
    assert!(h.surface.dismissed.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn reconnect_registers_again() {
    let h = harness();
    let pipe = h.start().await;

    pipe.drop_connection().await;
    wait_until(|| async { h.factory.connects.load(Ordering::SeqCst) >= 2 }).await;
    wait_until(|| async { h.client.is_connected() }).await;

    let new_pipe = h.factory.current().unwrap();
    wait_until(|| async {
        new_pipe
            .sent_events()
            .await
            .iter()
            .any(|e| matches!(e, SignalEvent::Register(_)))
    })
    .await;
}

#[tokio::test]
async fn connected_call_ends_after_the_disconnect_grace() {
    let h = harness_with(ClientConfig {
        call: CallConfig {
            disconnect_grace_secs: 1,
            ..CallConfig::default()
        },
        reconnect_cap_secs: 30,
        ..ClientConfig::new("u1")
    });
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;
    h.client.answer_call().await.unwrap();

    pipe.drop_connection().await;
    wait_until(|| async { h.client.manager.is_idle().await }).await;
    assert!(h.client.manager.status().await.is_some());
}

#[tokio::test]
async fn mute_and_speaker_follow_the_connected_call() {
    let h = harness();
    let pipe = h.start().await;

    pipe.inject(&offer_from(&guide())).await;
    wait_until(|| async { h.client.manager.phase().await.is_ringing() }).await;
    assert!(h.client.toggle_mute().await.is_err());

    h.client.answer_call().await.unwrap();
    assert!(h.client.toggle_mute().await.unwrap());
    assert!(!h.client.toggle_mute().await.unwrap());
    assert!(h.client.toggle_speaker().await.unwrap());
}
