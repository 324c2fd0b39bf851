use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use monitoring_cell::{CompletionLabel, DashboardEntry, DashboardProjector};
use session_cell::{SessionPhase, SessionStore};
use shared_clients::{
    AppointmentRecord, AppointmentWorkflowStatus, InMemoryAppointmentDirectory,
};
use shared_config::AppConfig;

// ==============================================================================
// HELPERS
// ==============================================================================

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        imminent_window_minutes: 10,
        default_duration_minutes: 30,
        ..AppConfig::default()
    })
}

struct Harness {
    projector: DashboardProjector,
    store: SessionStore,
    directory: Arc<InMemoryAppointmentDirectory>,
}

fn harness() -> Harness {
    let store = SessionStore::new();
    let directory = Arc::new(InMemoryAppointmentDirectory::new());
    let projector = DashboardProjector::new(test_config(), store.clone(), directory.clone());
    Harness {
        projector,
        store,
        directory,
    }
}

fn record(
    start_offset_minutes: i64,
    patient_name: &str,
    provider_name: &str,
    reason: Option<&str>,
) -> AppointmentRecord {
    AppointmentRecord {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        patient_name: patient_name.to_string(),
        provider_name: provider_name.to_string(),
        start_time: Utc::now() + Duration::minutes(start_offset_minutes),
        duration_minutes: Some(30),
        status: AppointmentWorkflowStatus::Approved,
        reason: reason.map(str::to_string),
    }
}

async fn track(h: &Harness, start_offset_minutes: i64) -> AppointmentRecord {
    let record = record(start_offset_minutes, "Maya Okafor", "Dr. Lindqvist", None);
    h.directory.insert(record.clone()).await;
    h.store.get_or_create(record.id).await;
    record
}

fn ids(entries: &[DashboardEntry]) -> Vec<Uuid> {
    entries.iter().map(|entry| entry.appointment_id).collect()
}

// ==============================================================================
// BUCKETS
// ==============================================================================

#[tokio::test]
async fn test_sessions_bucket_by_phase() {
    let h = harness();
    let upcoming = track(&h, 60).await;
    let active = track(&h, -5).await;
    let past = track(&h, -120).await;

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert_eq!(ids(&dashboard.upcoming), vec![upcoming.id]);
    assert_eq!(ids(&dashboard.active), vec![active.id]);
    assert_eq!(ids(&dashboard.past), vec![past.id]);
    assert_eq!(dashboard.counts.upcoming, 1);
    assert_eq!(dashboard.counts.active, 1);
    assert_eq!(dashboard.counts.past, 1);
    assert_eq!(dashboard.counts.total, 3);
}

#[tokio::test]
async fn test_imminent_sessions_count_as_upcoming() {
    let h = harness();
    let soon = track(&h, 5).await;

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert_eq!(ids(&dashboard.upcoming), vec![soon.id]);
    assert_eq!(dashboard.upcoming[0].phase, SessionPhase::Imminent);
    assert!(dashboard.active.is_empty());
}

#[tokio::test]
async fn test_explicit_end_moves_a_session_to_past() {
    let h = harness();
    let record = track(&h, -5).await;

    {
        let handle = h.store.get(record.id).await.unwrap();
        let mut session = handle.lock().await;
        session.ended_explicitly = true;
        session.ended_at = Some(Utc::now());
    }

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert!(dashboard.active.is_empty());
    assert_eq!(ids(&dashboard.past), vec![record.id]);
    assert_eq!(dashboard.past[0].phase, SessionPhase::Ended);
}

#[tokio::test]
async fn test_past_is_most_recent_first() {
    let h = harness();
    let older = track(&h, -240).await;
    let newer = track(&h, -120).await;

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert_eq!(ids(&dashboard.past), vec![newer.id, older.id]);
}

#[tokio::test]
async fn test_sessions_without_records_are_skipped() {
    let h = harness();
    h.store.get_or_create(Uuid::new_v4()).await;

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert_eq!(dashboard.counts.total, 0);
}

// ==============================================================================
// FILTERING
// ==============================================================================

#[tokio::test]
async fn test_filter_is_case_insensitive_over_names_and_reason() {
    let h = harness();

    let by_provider = record(60, "Maya Okafor", "Dr. Lindqvist", Some("Annual check-in"));
    let by_reason = record(90, "Tomas Reyes", "Dr. Achebe", Some("Recurring migraine"));
    for r in [&by_provider, &by_reason] {
        h.directory.insert(r.clone()).await;
        h.store.get_or_create(r.id).await;
    }

    let dashboard = h.projector.project(Utc::now(), Some("LIND")).await.unwrap();
    assert_eq!(ids(&dashboard.upcoming), vec![by_provider.id]);
    assert_eq!(dashboard.counts.total, 1);

    let dashboard = h.projector.project(Utc::now(), Some("migraine")).await.unwrap();
    assert_eq!(ids(&dashboard.upcoming), vec![by_reason.id]);

    let dashboard = h.projector.project(Utc::now(), Some("nobody")).await.unwrap();
    assert_eq!(dashboard.counts.total, 0);

    // Blank filters behave like no filter.
    let dashboard = h.projector.project(Utc::now(), Some("  ")).await.unwrap();
    assert_eq!(dashboard.counts.total, 2);
}

// ==============================================================================
// COMPLETION LABELS
// ==============================================================================

#[tokio::test]
async fn test_completion_labels_follow_ever_joined() {
    let h = harness();

    let both = track(&h, -120).await;
    let provider_only = track(&h, -121).await;
    let patient_only = track(&h, -122).await;
    let neither = track(&h, -123).await;

    let joined_at = Some(Utc::now() - Duration::minutes(115));
    for (id, provider, patient) in [
        (both.id, true, true),
        (provider_only.id, true, false),
        (patient_only.id, false, true),
        (neither.id, false, false),
    ] {
        let handle = h.store.get(id).await.unwrap();
        let mut session = handle.lock().await;
        if provider {
            session.provider.joined_at = joined_at;
        }
        if patient {
            session.patient.joined_at = joined_at;
        }
        // Everyone has left by now; the label cares who ever joined.
        session.provider.joined = false;
        session.patient.joined = false;
    }

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();
    assert_eq!(dashboard.counts.past, 4);

    let label_of = |id: Uuid| {
        dashboard
            .past
            .iter()
            .find(|entry| entry.appointment_id == id)
            .and_then(|entry| entry.completion)
    };

    assert_eq!(label_of(both.id), Some(CompletionLabel::Completed));
    assert_eq!(label_of(provider_only.id), Some(CompletionLabel::ProviderOnly));
    assert_eq!(label_of(patient_only.id), Some(CompletionLabel::PatientOnly));
    assert_eq!(label_of(neither.id), Some(CompletionLabel::NoShow));
}

#[tokio::test]
async fn test_only_past_sessions_carry_a_label() {
    let h = harness();
    track(&h, 60).await;
    track(&h, -5).await;

    let dashboard = h.projector.project(Utc::now(), None).await.unwrap();

    assert!(dashboard.upcoming[0].completion.is_none());
    assert!(dashboard.active[0].completion.is_none());
}
