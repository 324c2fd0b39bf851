use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use reminder_cell::{templates, ReminderDispatcher, ReminderError};
use session_cell::{SessionPhase, SessionStore};
use shared_clients::{
    AppointmentRecord, AppointmentWorkflowStatus, ClientError, InMemoryAppointmentDirectory,
    Notifier, RecordingNotifier,
};
use shared_config::AppConfig;

// ==============================================================================
// HELPERS
// ==============================================================================

/// Notifier whose deliveries always fail.
struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user_id: Uuid, _template: &str, _data: Value) -> Result<(), ClientError> {
        Err(ClientError::Api {
            service: "notify-api",
            message: "gateway unreachable".to_string(),
        })
    }
}

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        imminent_window_minutes: 10,
        default_duration_minutes: 30,
        ..AppConfig::default()
    })
}

fn appointment(start_offset_minutes: i64) -> AppointmentRecord {
    AppointmentRecord {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        patient_name: "Maya Okafor".to_string(),
        provider_name: "Dr. Lindqvist".to_string(),
        start_time: Utc::now() + Duration::minutes(start_offset_minutes),
        duration_minutes: Some(30),
        status: AppointmentWorkflowStatus::Approved,
        reason: Some("Follow-up consultation".to_string()),
    }
}

struct Harness {
    dispatcher: ReminderDispatcher,
    store: SessionStore,
    directory: Arc<InMemoryAppointmentDirectory>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let store = SessionStore::new();
    let directory = Arc::new(InMemoryAppointmentDirectory::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let dispatcher = ReminderDispatcher::new(
        test_config(),
        store.clone(),
        directory.clone(),
        notifier.clone(),
    );
    Harness {
        dispatcher,
        store,
        directory,
        notifier,
    }
}

/// Seed the directory and the session store with one tracked appointment.
async fn track(h: &Harness, record: &AppointmentRecord) {
    h.directory.insert(record.clone()).await;
    h.store.get_or_create(record.id).await;
}

// ==============================================================================
// SWEEP BEHAVIOR
// ==============================================================================

#[tokio::test]
async fn test_imminent_sessions_notify_both_parties_once() {
    let h = harness();
    let record = appointment(5);
    track(&h, &record).await;

    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.examined, 1);
    assert_eq!(summary.reminded, 1);

    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|n| n.template == templates::SESSION_IMMINENT));
    assert_eq!(h.notifier.sent_to(record.patient_id).await.len(), 1);
    assert_eq!(h.notifier.sent_to(record.provider_id).await.len(), 1);

    // A second pass finds the transition already claimed.
    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.reminded, 0);
    assert_eq!(h.notifier.sent().await.len(), 2);
}

#[tokio::test]
async fn test_repeated_polls_send_exactly_one_reminder() {
    let h = harness();
    let record = appointment(5);
    track(&h, &record).await;

    for _ in 0..1_000 {
        h.dispatcher.poll_once(Utc::now()).await;
    }

    assert_eq!(h.notifier.sent().await.len(), 2);
}

#[tokio::test]
async fn test_upcoming_sessions_keep_their_reminder() {
    let h = harness();
    let record = appointment(60);
    track(&h, &record).await;

    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.reminded, 0);
    assert_eq!(summary.expired, 0);
    assert!(h.notifier.sent().await.is_empty());

    // Once the window opens the reminder still fires.
    let in_window = record.start_time - Duration::minutes(5);
    let summary = h.dispatcher.poll_once(in_window).await;
    assert_eq!(summary.reminded, 1);
    assert_eq!(h.notifier.sent().await.len(), 2);
}

#[tokio::test]
async fn test_missed_window_is_consumed_without_sending() {
    let h = harness();
    // Already five minutes into the consultation when first observed.
    let record = appointment(-5);
    track(&h, &record).await;

    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.reminded, 0);
    assert_eq!(summary.expired, 1);
    assert!(h.notifier.sent().await.is_empty());

    // The consumed transition never fires late.
    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.expired, 0);
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_directory_outage_skips_without_claiming() {
    let h = harness();
    // Tracked session with no directory record behaves like an outage.
    let orphan = Uuid::new_v4();
    h.store.get_or_create(orphan).await;

    let summary = h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.examined, 0);

    let handle = h.store.get(orphan).await.unwrap();
    assert_eq!(handle.lock().await.last_reminder_phase, None);
}

#[tokio::test]
async fn test_delivery_failure_still_claims_the_transition() {
    let store = SessionStore::new();
    let directory = Arc::new(InMemoryAppointmentDirectory::new());
    let dispatcher = ReminderDispatcher::new(
        test_config(),
        store.clone(),
        directory.clone(),
        Arc::new(FailingNotifier),
    );

    let record = appointment(5);
    directory.insert(record.clone()).await;
    store.get_or_create(record.id).await;

    let summary = dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.reminded, 1);

    let handle = store.get(record.id).await.unwrap();
    assert_eq!(
        handle.lock().await.last_reminder_phase,
        Some(SessionPhase::Imminent)
    );

    // No retry on later sweeps; one shot per transition.
    let summary = dispatcher.poll_once(Utc::now()).await;
    assert_eq!(summary.reminded, 0);
}

// ==============================================================================
// OPERATOR RESEND
// ==============================================================================

#[tokio::test]
async fn test_resend_bypasses_the_claim() {
    let h = harness();
    let record = appointment(5);
    track(&h, &record).await;

    h.dispatcher.poll_once(Utc::now()).await;
    assert_eq!(h.notifier.sent().await.len(), 2);

    h.dispatcher.resend(record.id).await.unwrap();
    assert_eq!(h.notifier.sent().await.len(), 4);
}

#[tokio::test]
async fn test_resend_for_unknown_appointment_is_not_found() {
    let h = harness();

    let result = h.dispatcher.resend(Uuid::new_v4()).await;
    assert_matches!(result, Err(ReminderError::NotFound(_)));
}

#[tokio::test]
async fn test_resend_surfaces_delivery_failures() {
    let store = SessionStore::new();
    let directory = Arc::new(InMemoryAppointmentDirectory::new());
    let dispatcher = ReminderDispatcher::new(
        test_config(),
        store,
        directory.clone(),
        Arc::new(FailingNotifier),
    );

    let record = appointment(5);
    directory.insert(record.clone()).await;

    let result = dispatcher.resend(record.id).await;
    assert_matches!(result, Err(ReminderError::Delivery { message }) => {
        assert!(message.contains("gateway unreachable"));
    });
}
