// apps/api/src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{
    Appointment, AppointmentBookingService, AppointmentCellState, Clinic, ClinicRegistry,
};
use auth_cell::{AuthCellState, SessionRecord, SessionService};
use call_session_cell::{
    CallCellState, CallSession, CallSessionService, CallSweeper, HmacTokenSigner,
};
use role_directory_cell::{RoleCellState, RoleDirectoryService, RoleRecord};
use shared_config::AppConfig;
use shared_store::Collection;

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

    info!("Starting CareLink Clinic API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("JWT secret is not set; authenticated routes will reject everything");
    }
    if !config.is_rtc_configured() {
        warn!("RTC credentials are not set; media token issuance will fail");
    }

    // Wire the cells
    let roles = RoleDirectoryService::new(Collection::<RoleRecord>::new("roles"));
    let clinics = ClinicRegistry::new(Collection::<Clinic>::new("clinics"));
    let bookings = AppointmentBookingService::new(
        Collection::<Appointment>::new("appointments"),
        clinics.clone(),
    );
    let calls = CallSessionService::new(Collection::<CallSession>::new("call_sessions"));
    let sessions = SessionService::new(
        config.clone(),
        Collection::<SessionRecord>::new("sessions"),
        roles.clone(),
    );

    if let Err(e) = clinics.register(ClinicRegistry::default_clinic(&config)).await {
        warn!("Could not seed the default clinic: {}", e);
    }

    // Background expiry of unanswered calls
    let sweeper = Arc::new(CallSweeper::new(calls.clone(), &config));
    let sweeper_task = sweeper.clone();
    tokio::spawn(async move { sweeper_task.run().await });

    let cells = router::AppCells {
        appointments: AppointmentCellState {
            config: config.clone(),
            bookings,
            clinics,
            roles: roles.clone(),
        },
        calls: CallCellState {
            config: config.clone(),
            calls,
            roles: roles.clone(),
            tokens: Arc::new(HmacTokenSigner::new(&config)),
        },
        roles: RoleCellState {
            config: config.clone(),
            directory: roles.clone(),
        },
        auth: AuthCellState {
            config: config.clone(),
            sessions,
            roles,
        },
    };

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(cells)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweeper))
        .await
        .unwrap();
}

async fn shutdown_signal(sweeper: Arc<CallSweeper>) {
    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received");
    sweeper.shutdown().await;
}
