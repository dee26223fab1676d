mod common;

use std::sync::Arc;

use common::{credentials, test_state, FakeConnector, Failure, Script};
use telegram_extractor_backend::config::Delivery;
use telegram_extractor_backend::error::AppError;
use telegram_extractor_backend::models::{ExtractType, InviteLink, MemberCount, NOT_AVAILABLE};
use telegram_extractor_backend::services::extraction::Extraction;
use telegram_extractor_backend::services::messaging::{Contact, DialogKind};

fn groups_script() -> Script {
    Script::default()
        .dialog(1, "Alice", DialogKind::User, None)
        .dialog(10, "Rustaceans", DialogKind::Group, Some(42))
        .dialog(20, "Announcements", DialogKind::Channel, None)
        .invite(10, Ok("https://t.me/+rust"))
        .invite(20, Ok("https://t.me/+news"))
}

#[actix_web::test]
async fn groups_skip_private_chats_and_keep_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(FakeConnector::new(groups_script()));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let extraction = state
        .extractor()
        .extract(&credentials(), ExtractType::Groups)
        .await
        .unwrap();

    let Extraction::Groups(groups) = extraction else {
        panic!("expected groups");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id, 10);
    assert_eq!(groups[0].member_count, MemberCount::Known(42));
    assert_eq!(groups[0].invite_link, InviteLink::Link("https://t.me/+rust".into()));
    assert_eq!(groups[1].id, 20);
    assert_eq!(groups[1].member_count, MemberCount::Unknown);

    assert_eq!(connector.counters.opened(), 1);
    assert_eq!(connector.counters.closed(), 1);
    assert!(!connector.counters.events().contains(&"invite 1".to_string()));
}

#[actix_web::test]
async fn failed_invite_export_marks_link_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let script = groups_script().invite(20, Err(Failure::Platform("CHAT_ADMIN_REQUIRED")));
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let Extraction::Groups(groups) = state
        .extractor()
        .extract(&credentials(), ExtractType::Groups)
        .await
        .unwrap()
    else {
        panic!("expected groups");
    };

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].invite_link, InviteLink::Unavailable);
}

#[actix_web::test]
async fn flood_wait_during_invite_export_aborts_and_closes() {
    let dir = tempfile::tempdir().unwrap();
    let script = groups_script().invite(10, Err(Failure::Flood(37)));
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let err = state
        .extractor()
        .extract(&credentials(), ExtractType::Groups)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RateLimited { wait_seconds: 37 }));
    assert_eq!(connector.counters.closed(), 1);
    assert!(!connector.counters.events().contains(&"invite 20".to_string()));
}

#[actix_web::test]
async fn listing_failure_still_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        dialogs_failure: Some(Failure::Platform("connection reset")),
        ..Script::default()
    };
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let err = state
        .extractor()
        .extract(&credentials(), ExtractType::Groups)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Platform(_)));
    assert_eq!(connector.counters.opened(), 1);
    assert_eq!(connector.counters.closed(), 1);
}

#[actix_web::test]
async fn contacts_get_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        contacts: vec![
            Contact {
                id: 7,
                first_name: Some("Dana".into()),
                last_name: Some("Kim".into()),
                username: Some("dkim".into()),
                phone: Some("15550123".into()),
                status: "online".into(),
            },
            Contact {
                id: 8,
                first_name: Some("Eli".into()),
                status: "long time ago".into(),
                ..Default::default()
            },
        ],
        ..Script::default()
    };
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let Extraction::Contacts(contacts) = state
        .extractor()
        .extract(&credentials(), ExtractType::Contacts)
        .await
        .unwrap()
    else {
        panic!("expected contacts");
    };

    assert_eq!(contacts[0].name, "Dana Kim");
    assert_eq!(contacts[1].name, "Eli");
    assert_eq!(contacts[1].username, NOT_AVAILABLE);
    assert_eq!(contacts[1].phone, NOT_AVAILABLE);
    assert_eq!(connector.counters.closed(), 1);
}

#[actix_web::test]
async fn membership_follows_dialog_order_not_selection_order() {
    let dir = tempfile::tempdir().unwrap();
    let script = groups_script()
        .members(10, &[(100, "Ann", Some("ann")), (101, "Ben", None)])
        .members(20, &[(200, "Cat", Some("cat"))]);
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let rows = state
        .extractor()
        .expand_members(&credentials(), &[20, 10, 999])
        .await
        .unwrap();

    let users: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    assert_eq!(users, vec![100, 101, 200]);
    assert_eq!(rows[0].group_name, "Rustaceans");
    assert_eq!(rows[1].username, None);
    assert_eq!(rows[2].group_id, 20);
    assert_eq!(connector.counters.closed(), 1);
}

#[actix_web::test]
async fn empty_selection_never_opens_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(FakeConnector::new(groups_script()));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let rows = state
        .extractor()
        .expand_members(&credentials(), &[])
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(connector.counters.opened(), 0);
}

#[actix_web::test]
async fn participant_flood_wait_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        participants_failure: Some(Failure::Flood(5)),
        ..groups_script()
    };
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let err = state
        .extractor()
        .expand_members(&credentials(), &[10])
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(connector.counters.closed(), 1);
}

#[actix_web::test]
async fn flood_wait_while_listing_dialogs_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        dialogs_failure: Some(Failure::Flood(120)),
        ..groups_script()
    };
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let err = state
        .extractor()
        .extract(&credentials(), ExtractType::Groups)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RateLimited { wait_seconds: 120 }));
    assert_eq!(connector.counters.closed(), 1);
    assert_eq!(connector.counters.events().last().unwrap(), "close");
}

#[actix_web::test]
async fn flood_wait_while_listing_contacts_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        contacts_failure: Some(Failure::Flood(9)),
        ..Script::default()
    };
    let connector = Arc::new(FakeConnector::new(script));
    let state = test_state(dir.path(), Delivery::Inline, connector.clone());

    let err = state
        .extractor()
        .extract(&credentials(), ExtractType::Contacts)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RateLimited { wait_seconds: 9 }));
    assert_eq!(connector.counters.opened(), 1);
    assert_eq!(connector.counters.closed(), 1);
}
