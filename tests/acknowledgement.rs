//! Acknowledgement Tests
//!
//! Covers read/delete policy, not-found handling, validation ordering and
//! nonce rejection.

mod common;

use axum::http::StatusCode;
use common::app;

use tray::app::notifications::NotificationStore;
use tray::domain::fragment;
use tray::domain::notification::{Fadeout, NewNotification, Owner};

// ===========================================================================
// Policy
// ===========================================================================

#[tokio::test]
async fn welcome_scenario_marks_read_and_keeps_record() {
    let app = app();
    let created = app
        .create(
            NewNotification::new(Owner::User(42), "Welcome")
                .fadeout(Fadeout::seconds(5).unwrap())
                .delete_after_read(false),
        )
        .await;

    let unread = app.store.list_unread(&Owner::User(42)).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].message, "Welcome");

    let resp = app.acknowledge(created.id).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.success(), Some(true));
    assert_eq!(resp.message(), "Notification marked as read or deleted.");

    let stored = app.store.get(created.id).await.unwrap().expect("record kept");
    assert!(stored.is_read);
    assert!(stored.read_at.is_some());
    assert!(app.store.list_unread(&Owner::User(42)).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_after_read_removes_record() {
    let app = app();
    let created = app
        .create(NewNotification::new(Owner::User(3), "one-shot").delete_after_read(true))
        .await;

    let resp = app.acknowledge(created.id).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(app.store.get(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn guest_notifications_delete_by_default() {
    let app = app();
    let created = app.notify_guest("session_guest1", "bye soon").await;
    assert!(created.delete_after_read);
    assert_eq!(app.store.get_policy(created.id).await.unwrap(), Some(true));

    app.acknowledge(created.id).await;
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn user_notifications_are_kept_by_default() {
    let app = app();
    let created = app.notify_user(8, "stays").await;
    assert_eq!(app.store.get_policy(created.id).await.unwrap(), Some(false));

    app.acknowledge(created.id).await;
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn second_acknowledgement_of_deleted_record_is_not_found() {
    let app = app();
    let created = app.notify_guest("session_twice", "twice").await;

    let first = app.acknowledge(created.id).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.acknowledge(created.id).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.success(), Some(false));
    assert_eq!(second.message(), "Notification not found.");
}

#[tokio::test]
async fn reacknowledging_read_record_is_a_noop_success() {
    let app = app();
    let created = app.notify_user(4, "again").await;

    app.acknowledge(created.id).await;
    let read_at = app.store.get(created.id).await.unwrap().unwrap().read_at;

    let resp = app.acknowledge(created.id).await;
    assert_eq!(resp.status, StatusCode::OK);
    let stored = app.store.get(created.id).await.unwrap().unwrap();
    assert!(stored.is_read);
    assert_eq!(stored.read_at, read_at);
}

#[tokio::test]
async fn acknowledged_record_leaves_the_fragment() {
    let app = app();
    let created = app.notify_user(11, "gone after ack").await;

    app.acknowledge(created.id).await;

    let resp = app.deliver_as_user(11).await;
    assert!(fragment::parse(&resp.text()).unwrap().is_empty());
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn unknown_id_is_not_found_and_mutates_nothing() {
    let app = app();
    app.notify_user(1, "untouched").await;
    app.notify_guest("session_x", "also untouched").await;
    let before = app.store_state();

    let resp = app.acknowledge(999_999).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.message(), "Notification not found.");
    assert_eq!(app.store_state(), before);
}

#[tokio::test]
async fn missing_id_is_rejected() {
    let app = app();
    let nonce = app.guest_nonce();

    let resp = app
        .post_form(
            "/ajax",
            &[("action", "mark_notification_as_read"), ("nonce", nonce.as_str())],
            &[],
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.success(), Some(false));
    assert_eq!(resp.message(), "Notification ID is required.");
}

#[tokio::test]
async fn non_integer_id_is_rejected() {
    let app = app();
    let created = app.notify_user(1, "still here").await;
    let nonce = app.guest_nonce();

    let resp = app
        .post_form(
            "/ajax",
            &[
                ("action", "mark_notification_as_read"),
                ("nonce", nonce.as_str()),
                ("notification_id", "12abc"),
            ],
            &[],
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Notification ID must be an integer.");
    assert!(!app.store.get(created.id).await.unwrap().unwrap().is_read);
}

#[tokio::test]
async fn invalid_nonce_is_checked_before_id() {
    let app = app();

    let resp = app
        .post_form("/ajax", &[("action", "mark_notification_as_read")], &[])
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.message(), "Invalid nonce");
}

#[tokio::test]
async fn invalid_nonce_leaves_store_unchanged() {
    let app = app();
    let kept = app.notify_user(1, "kept").await;
    let deleted_on_ack = app.notify_guest("session_nonce", "would be deleted").await;
    let before = app.store_state();

    for id in [kept.id, deleted_on_ack.id] {
        let id = id.to_string();
        let resp = app
            .post_form(
                "/ajax",
                &[
                    ("action", "mark_notification_as_read"),
                    ("nonce", "ffffffffffffffffffff"),
                    ("notification_id", id.as_str()),
                ],
                &[],
            )
            .await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
        assert_eq!(resp.success(), Some(false));
    }

    assert_eq!(app.store_state(), before);
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_acknowledgements_delete_exactly_once() {
    let app = app();
    let created = app.notify_guest("session_race", "raced").await;

    let (first, second) = tokio::join!(app.acknowledge(created.id), app.acknowledge(created.id));
    let mut statuses = vec![first.status.as_u16(), second.status.as_u16()];
    statuses.sort_unstable();

    assert_eq!(statuses, vec![200, 404]);
    assert!(app.store.get(created.id).await.unwrap().is_none());
    assert!(app.store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_acknowledgements_of_retained_record_both_succeed() {
    let app = app();
    let created = app.notify_user(21, "raced").await;

    let (first, second) = tokio::join!(app.acknowledge(created.id), app.acknowledge(created.id));

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(app.store_state(), vec![(created.id, true)]);
}
