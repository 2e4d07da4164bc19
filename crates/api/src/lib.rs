//! # Slotdesk API
//!
//! The web server of the appointment assistant: chat, form booking,
//! availability and the one-time calendar sign-in.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into calls on the core services
//! - **Middleware**: Error mapping and OAuth state tracking
//! - **Config**: Environment configuration
//!
//! Business logic lives in `slotdesk_core`. [`build_state`] wires it to
//! PostgreSQL and the hosted services; unconfigured services are replaced by
//! stand-ins that answer `503 Service Unavailable`.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Error mapping and OAuth state tracking
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
};
use eyre::Result;
use slotdesk_core::{
    conversation::desk::ChatDesk,
    ports::{
        AppointmentStore, CalendarService, ChatModel, IdentityProvider, KnowledgeSearch, Mailer,
        TokenStore,
    },
    scheduling::{availability::AvailabilityFinder, booking::BookingWriter},
};
use slotdesk_db::{DbPool, PgStore};
use slotdesk_integrations::{
    graph::{
        auth::{GraphAuth, TokenManager},
        calendar::GraphCalendar,
        mail::GraphMailer,
    },
    http_client,
    openai::AzureOpenAi,
    search::AzureSearch,
    unconfigured::Unconfigured,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::ApiConfig;
use crate::handlers::{booking::IDEMPOTENCY_HEADER, chat::SESSION_HEADER};
use crate::middleware::auth::OAuthStates;

/// Shared application state that is accessible to all request handlers
///
/// Every outside system is held behind a port trait, so tests can build the
/// state from mocks.
pub struct ApiState {
    pub booking: Arc<BookingWriter>,
    pub availability: Arc<AvailabilityFinder>,
    pub desk: Arc<ChatDesk>,
    pub appointments: Arc<dyn AppointmentStore>,
    /// `None` when Microsoft sign-in is not configured
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Where tokens from the sign-in callback are saved
    pub tokens: Arc<dyn TokenStore>,
    pub oauth_states: OAuthStates,
}

/// Wires the core services to PostgreSQL and the configured hosted services
pub fn build_state(config: &ApiConfig, pool: DbPool) -> Result<ApiState> {
    let store = Arc::new(PgStore::new(pool));
    let http = http_client(config.integrations.http_timeout)?;
    let timezone = config.business_hours.timezone;

    let graph = config.integrations.graph.clone().map(|graph| {
        let auth = Arc::new(GraphAuth::new(graph.clone(), http.clone()));
        let tokens = Arc::new(TokenManager::new(auth.clone(), store.clone()));
        (graph, auth, tokens)
    });
    if graph.is_none() {
        warn!("Microsoft Graph is not configured; booking and availability will answer 503");
    }

    let calendar: Arc<dyn CalendarService> = match &graph {
        Some((graph, _, tokens)) => Arc::new(GraphCalendar::new(
            graph.clone(),
            http.clone(),
            tokens.clone(),
            timezone,
        )),
        None => Arc::new(Unconfigured::new("Microsoft Graph calendar")),
    };
    let mailer: Arc<dyn Mailer> = match &graph {
        Some((graph, _, tokens)) => {
            Arc::new(GraphMailer::new(graph.clone(), http.clone(), tokens.clone()))
        }
        None => Arc::new(Unconfigured::new("Microsoft Graph mail")),
    };
    let identity: Option<Arc<dyn IdentityProvider>> = match &graph {
        Some((_, auth, _)) => Some(auth.clone()),
        None => None,
    };
    let tokens: Arc<dyn TokenStore> = match &graph {
        Some((_, _, tokens)) => tokens.clone(),
        None => store.clone(),
    };

    let model: Arc<dyn ChatModel> = match &config.integrations.openai {
        Some(openai) => Arc::new(AzureOpenAi::new(openai.clone(), http.clone())),
        None => {
            warn!("Azure OpenAI is not configured; knowledge answers will answer 503");
            Arc::new(Unconfigured::new("Azure OpenAI"))
        }
    };
    let search: Arc<dyn KnowledgeSearch> = match &config.integrations.search {
        Some(search) => Arc::new(AzureSearch::new(search.clone(), http)),
        None => {
            warn!("Azure Search is not configured; knowledge answers will answer 503");
            Arc::new(Unconfigured::new("Azure Search"))
        }
    };

    let availability = Arc::new(AvailabilityFinder::new(
        calendar.clone(),
        store.clone(),
        config.business_hours.clone(),
        config.slot_params,
    ));
    let booking = Arc::new(BookingWriter::new(
        calendar,
        store.clone(),
        mailer,
        config.business_hours.clone(),
        config.slot_params.duration,
        config.operator_email.clone(),
    ));
    let desk = Arc::new(ChatDesk::new(
        store.clone(),
        booking.clone(),
        availability.clone(),
        search,
        model,
        config.assistant.clone(),
    ));

    Ok(ApiState {
        booking,
        availability,
        desk,
        appointments: store,
        identity,
        tokens,
        oauth_states: OAuthStates::new(),
    })
}

/// Builds the application router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Liveness, health and version
        .merge(routes::health::routes())
        // Chat assistant
        .merge(routes::chat::routes())
        // Form booking and appointment lookup
        .merge(routes::booking::routes())
        // Free slots
        .merge(routes::availability::routes())
        // Calendar sign-in
        .merge(routes::calendar::routes())
        .with_state(state)
}

/// Builds the CORS layer. `*` allows any origin; invalid origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(IDEMPOTENCY_HEADER),
            HeaderName::from_static(SESSION_HEADER),
        ]);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(allowed).allow_credentials(true)
}

/// Starts the API server with the provided configuration and database connection
///
/// Installs the log subscriber (`RUST_LOG` overrides `LOG_LEVEL`), removes
/// abandoned chat drafts and serves until the process is stopped.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> eyre::Result<()> {
/// let config = slotdesk_api::config::ApiConfig::from_env()?;
/// let db_pool = slotdesk_db::create_pool(&config.database_url).await?;
/// slotdesk_api::start_server(config, db_pool).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(config: ApiConfig, db_pool: DbPool) -> Result<()> {
    // Initialize tracing for logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    PgStore::new(db_pool.clone()).purge_expired_drafts().await?;

    let state = Arc::new(build_state(&config, db_pool)?);
    let app = router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.request_timeout())),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
