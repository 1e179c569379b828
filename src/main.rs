use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use std::sync::Arc;
use std::time::Duration;
use swipe_dine::config::{Settings, StoreBackend};
use swipe_dine::routes::{self, sessions::AppState};
use swipe_dine::services::{DeviceRegistry, GooglePlacesClient, KeyValueStore, MemoryStore, RedisStore, SessionRegistry};
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub retryable: bool,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
        retryable: false,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
        retryable: false,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // Initialize logging; LOG_LEVEL and LOG_FORMAT win over the config file
    let (config_level, config_format) = match &settings {
        Ok(s) => (s.logging.level.clone(), s.logging.format.clone()),
        Err(_) => ("info".to_string(), "json".to_string()),
    };
    let log_level = std::env::var("LOG_LEVEL").unwrap_or(config_level);
    let log_format = std::env::var("LOG_FORMAT").unwrap_or(config_format);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Swipe Dine discovery service...");

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    info!("Configuration loaded successfully");

    // Initialize places client
    let timeout = Duration::from_secs(settings.places.timeout_secs.unwrap_or(10));
    let places = Arc::new(GooglePlacesClient::new(
        settings.places.endpoint.clone(),
        settings.places.api_key.clone(),
        timeout,
    ));

    info!("Places client initialized ({}, timeout {:?})", settings.places.endpoint, timeout);

    // Initialize preference store
    let l1_size = settings.store.l1_cache_size.unwrap_or(1000);
    let l1_ttl = settings.store.l1_ttl_secs.unwrap_or(300);

    let store: Arc<dyn KeyValueStore> = match (settings.store.backend, &settings.store.redis_url) {
        (StoreBackend::Redis, Some(url)) => match RedisStore::new(url, l1_size, l1_ttl).await {
            Ok(store) => {
                info!("Redis store initialized (L1: {} entries, TTL: {}s)", l1_size, l1_ttl);
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to connect to Redis: {}", e);
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "Redis connection required"));
            }
        },
        (StoreBackend::Redis, None) => {
            error!("store.backend is redis but store.redis_url is not set");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "Missing store.redis_url"));
        }
        (StoreBackend::Memory, _) => {
            warn!("Using in-memory preference store; preferences are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let policy = settings.discovery.radius_policy();
    info!("Discovery radius policy: {:?}", policy);

    let app_state = AppState {
        places: places.clone(),
        search: places.clone(),
        store,
        devices: Arc::new(DeviceRegistry::new(
            settings.sessions.max_sessions,
            settings.sessions.idle_secs,
            Some(places),
        )),
        sessions: SessionRegistry::new(settings.sessions.max_sessions, settings.sessions.idle_secs),
        policy,
        movement_tolerance_deg: settings.discovery.movement_tolerance_deg,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
