//! End-to-end tests for the service lifecycle
//!
//! Covers:
//! - Chat history download
//! - Configuration updates resetting the cache
//! - Bots feeding synthetic notifications
//! - Shutdown

mod common;

use std::time::Duration;

use common::*;
use geoconfess_sync::api::HttpMethod;
use geoconfess_sync::cache::ReadState;
use geoconfess_sync::model::{NotificationAction, ResourceId};
use geoconfess_sync::{NotificationEvent, ServiceStatus, SyncError, SyncSettings};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_history_download_on_first_start() {
    let transport = ScriptedTransport::new();
    transport.set_fallback(
        HttpMethod::Get,
        MESSAGES_PATH,
        Ok(json!([
            message_json(8, OTHER_USER_ID, USER_ID, "Second"),
            message_json(3, USER_ID, OTHER_USER_ID, "First"),
        ])),
    );
    let mut service = TestService::spawn(test_settings(), transport.clone());

    service.handle.start().await.unwrap();

    match service.next_event().await {
        NotificationEvent::MessagesAdded(messages) => {
            let ids: Vec<_> = messages.iter().map(|m| m.id).collect();
            assert_eq!(ids, vec![ResourceId(3), ResourceId(8)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    let messages = service.handle.messages().await.unwrap();
    assert_eq!(messages[0].text, "First");
    assert_eq!(messages[1].text, "Second");

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_history_is_retried_on_next_start() {
    let transport = ScriptedTransport::new();
    transport.push(
        HttpMethod::Get,
        MESSAGES_PATH,
        Err(SyncError::Connectivity("offline".to_string())),
    );
    let service = TestService::spawn(test_settings(), transport.clone());

    service.handle.start().await.unwrap();
    transport
        .wait_for_requests(HttpMethod::Get, MESSAGES_PATH, 1)
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    service.handle.stop().await.unwrap();
    service.handle.start().await.unwrap();

    transport
        .wait_for_requests(HttpMethod::Get, MESSAGES_PATH, 2)
        .await;

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_configuration_update_resets_and_refetches() {
    let transport = ScriptedTransport::new();
    transport.set_fallback(
        HttpMethod::Get,
        NOTIFICATIONS_PATH,
        Ok(json!([
            meet_request_notification(1, "sent", meet_request_json(100, "pending")),
            meet_request_notification(2, "accepted", meet_request_json(100, "accepted")),
        ])),
    );
    let mut service = TestService::spawn(test_settings(), transport.clone());

    service.handle.start().await.unwrap();
    assert!(matches!(
        service.next_event().await,
        NotificationEvent::NotificationsAdded(_)
    ));

    let settings = SyncSettings {
        refresh_rate_secs: 10.0,
        ..test_settings()
    };
    service.handle.configuration_updated(settings).await.unwrap();

    match service.next_event().await {
        NotificationEvent::NotificationsDeleted(deleted) => assert_eq!(deleted.len(), 2),
        other => panic!("unexpected event {:?}", other),
    }
    match service.next_event().await {
        NotificationEvent::NotificationsAdded(added) => assert_eq!(added.len(), 2),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(service.handle.status(), ServiceStatus::Running);
    assert_eq!(transport.request_count(HttpMethod::Get, MESSAGES_PATH), 2);

    // The new refresh rate applies.
    transport
        .wait_for_requests(HttpMethod::Get, NOTIFICATIONS_PATH, 3)
        .await;
    let times = transport.request_times(HttpMethod::Get, NOTIFICATIONS_PATH);
    let gap = (times[2] - times[1]).as_secs_f64();
    assert!((10.0..10.01).contains(&gap), "refresh gap {}", gap);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_configuration_is_rejected() {
    let transport = ScriptedTransport::new();
    transport.set_fallback(
        HttpMethod::Get,
        NOTIFICATIONS_PATH,
        Ok(json!([meet_request_notification(
            1,
            "sent",
            meet_request_json(100, "pending")
        )])),
    );
    let mut service = TestService::spawn(test_settings(), transport.clone());
    service.handle.start().await.unwrap();
    assert!(matches!(
        service.next_event().await,
        NotificationEvent::NotificationsAdded(_)
    ));

    let settings = SyncSettings {
        refresh_rate_secs: 0.0,
        ..test_settings()
    };
    let result = service.handle.configuration_updated(settings).await;

    assert!(matches!(result, Err(SyncError::InvalidState(_))));
    assert_eq!(service.handle.notifications().await.unwrap().len(), 1);
    assert!(service.try_next_event().is_none());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_priest_bots_feed_synthetic_notifications() {
    let transport = ScriptedTransport::new();
    let settings = SyncSettings {
        priest_bots_enabled: true,
        max_bot_count: Some(1),
        fake_spawn_mean_rate_secs: 1.0,
        ..test_settings()
    };
    let service = TestService::spawn(settings, transport.clone());

    service.handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;

    let notifications = service.handle.notifications().await.unwrap();
    assert!(!notifications.is_empty());
    assert!(notifications.iter().all(|n| n.id.get() >= 100_000));

    let meet_requests = service.handle.meet_requests().await.unwrap();
    assert_eq!(meet_requests.len(), 1);
    let bot = service
        .handle
        .user_from_id(meet_requests[0].priest.id)
        .await
        .unwrap()
        .unwrap();
    assert!(bot.display_name().starts_with("Priest_Bot_"));

    // Synthetic notifications are read without a server round trip.
    let first = notifications[0].id;
    service.handle.mark_as_read(first).await.unwrap();
    assert_eq!(
        service.handle.read_state(first).await.unwrap(),
        Some(ReadState::Read)
    );
    assert!(transport
        .requests(HttpMethod::Put, &format!("/notifications/{}/mark_read", first))
        .is_empty());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_bots_are_disabled_by_default() {
    let transport = ScriptedTransport::new();
    let service = TestService::spawn(test_settings(), transport);

    service.handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;

    assert!(service.handle.notifications().await.unwrap().is_empty());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_fails_pending_and_later_calls() {
    let transport = ScriptedTransport::new();
    let _gate = transport.hold(HttpMethod::Get, NOTIFICATIONS_PATH);
    let service = TestService::spawn(test_settings(), transport.clone());
    let handle = service.handle.clone();

    let pending = {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .did_receive_push(ResourceId(1), NotificationAction::Sent)
                .await
        })
    };
    transport
        .wait_for_requests(HttpMethod::Get, NOTIFICATIONS_PATH, 1)
        .await;

    service.shutdown().await;

    assert_eq!(pending.await.unwrap(), Err(SyncError::ServiceStopped));
    assert_eq!(handle.start().await, Err(SyncError::ServiceStopped));
    assert_eq!(handle.status(), ServiceStatus::Stopped);
}
