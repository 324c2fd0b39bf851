use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use monitoring_cell::DashboardProjector;
use presence_cell::{PresenceGateway, PresenceRegistry, PresenceSweeper, RoomEventBridge};
use reminder_cell::{ReminderDispatcher, ReminderScheduler};
use session_cell::{SessionEventSink, SessionLifecycleService, SessionStore};
use shared_clients::{
    AppointmentDirectory, ChatStore, InMemoryAppointmentDirectory, InMemoryChatStore,
    LocalMeetingRoomProvider, MeetingRoomProvider, Notifier, RecordingNotifier,
    RestAppointmentDirectory, RestChatStore, RestMeetingRoomProvider, RestNotifier,
};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Telecare Session API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // External collaborators: REST clients where configured, in-memory
    // stand-ins otherwise so the server runs standalone.
    let directory: Arc<dyn AppointmentDirectory> = match RestAppointmentDirectory::new(&config) {
        Ok(client) => {
            info!("Using appointment API at {}", config.appointment_api_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Appointment API unavailable ({}), using in-memory directory", e);
            Arc::new(InMemoryAppointmentDirectory::new())
        }
    };

    let rooms: Arc<dyn MeetingRoomProvider> = match RestMeetingRoomProvider::new(&config) {
        Ok(client) => {
            info!("Using meeting room service at {}", config.room_service_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Meeting room service unavailable ({}), minting local links", e);
            Arc::new(LocalMeetingRoomProvider::new())
        }
    };

    let chat_store: Arc<dyn ChatStore> = match RestChatStore::new(&config) {
        Ok(client) => {
            info!("Using chat API at {}", config.chat_api_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Chat API unavailable ({}), keeping messages in memory", e);
            Arc::new(InMemoryChatStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match RestNotifier::new(&config) {
        Ok(client) => {
            info!("Using notification API at {}", config.notify_api_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Notification API unavailable ({}), recording in memory", e);
            Arc::new(RecordingNotifier::new())
        }
    };

    // Shared state
    let store = SessionStore::new();
    let registry = PresenceRegistry::new(&config);
    let gateway = Arc::new(PresenceGateway::new(registry.clone(), chat_store));
    let events: Arc<dyn SessionEventSink> = Arc::new(RoomEventBridge::new(registry.clone()));

    let sessions = Arc::new(SessionLifecycleService::new(
        config.clone(),
        store.clone(),
        directory.clone(),
        rooms,
        events,
    ));
    let reminders = Arc::new(ReminderDispatcher::new(
        config.clone(),
        store.clone(),
        directory.clone(),
        notifier,
    ));
    let projector = Arc::new(DashboardProjector::new(
        config.clone(),
        store.clone(),
        directory,
    ));

    // Background tasks
    let sweeper = PresenceSweeper::new(registry.clone(), config.heartbeat_interval_seconds);
    tokio::spawn(async move { sweeper.run().await });

    let scheduler = ReminderScheduler::new(reminders.clone(), config.reminder_poll_seconds);
    tokio::spawn(async move { scheduler.run().await });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(sessions, gateway, reminders, projector)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .await
        .unwrap();
}
