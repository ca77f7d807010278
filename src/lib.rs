pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod users;
pub mod validation;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode, Uri},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    handlers as auth_handlers, models as auth_models, require_auth, AccountService, AuthGate,
    PasswordService, TokenService, UserDirectory,
};
use config::ConfigError;
use error::ErrorResponse;
use mail::Mailer;
use users::{handlers as user_handlers, models as user_models, ProfileService, ProfileStore};

/// Request bodies above this size are rejected with 413
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth_handlers::login,
        auth_handlers::register,
        auth_handlers::forget_password,
        auth_handlers::reset_password,
        auth_handlers::change_password,
        user_handlers::get_profile,
        user_handlers::update_profile,
        user_handlers::delete_profile,
        user_handlers::list_notifications,
        user_handlers::modify_allowed_notifications,
        user_handlers::send_contact_us,
    ),
    components(
        schemas(
            ErrorResponse,
            auth_models::LoginRequest,
            auth_models::RegisterRequest,
            auth_models::ForgotPasswordRequest,
            auth_models::ResetPasswordRequest,
            auth_models::ChangePasswordRequest,
            auth_models::AuthResponse,
            auth_models::RegisterResponse,
            auth_models::AccountResponse,
            auth_models::AccountDetail,
            auth_models::Role,
            auth_models::Interest,
            user_models::ProfileResponse,
            user_models::UpdateProfileRequest,
            user_models::NotificationResponse,
            user_models::AllowedNotificationsRequest,
            user_models::ContactUsRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, registration and password lifecycle"),
        (name = "users", description = "Profile, notifications and contact-us for the logged-in account")
    ),
    info(
        title = "Newsdesk API",
        version = "1.0.0",
        description = "Accounts and credential lifecycle for the newsroom backend"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub profile_service: Arc<ProfileService>,
    pub auth_gate: Arc<AuthGate>,
    pub token_service: Arc<TokenService>,
}

impl AppState {
    /// Wire the services around their shared collaborators
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn ProfileStore>,
        mailer: Arc<dyn Mailer>,
        password_service: PasswordService,
        token_service: TokenService,
        org_inbox: String,
    ) -> Self {
        let token_service = Arc::new(token_service);

        Self {
            account_service: Arc::new(AccountService::new(
                directory.clone(),
                password_service,
                token_service.clone(),
                mailer.clone(),
                org_inbox.clone(),
            )),
            profile_service: Arc::new(ProfileService::new(
                directory.clone(),
                store,
                mailer,
                org_inbox,
            )),
            auth_gate: Arc::new(AuthGate::new(token_service.clone(), directory)),
            token_service,
        }
    }
}

/// Handler for requests that match no route
async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "Can't find {} on this server!",
            uri.path()
        ))),
    )
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds the HTTP middleware stack
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/forget-password", post(auth_handlers::forget_password))
        .route("/auth/reset-password", post(auth_handlers::reset_password));

    let protected = Router::new()
        .route("/auth/change-password", post(auth_handlers::change_password))
        .route(
            "/users",
            get(user_handlers::get_profile)
                .patch(user_handlers::update_profile)
                .delete(user_handlers::delete_profile),
        )
        .route(
            "/users/notifications",
            get(user_handlers::list_notifications)
                .patch(user_handlers::modify_allowed_notifications),
        )
        .route("/users/send-contact-us", post(user_handlers::send_contact_us))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API routes
        .nest("/api/v1", public.merge(protected))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("0"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wrap the router in a per-client-IP limit of `per_hour` requests
///
/// Needs the server to provide `ConnectInfo<SocketAddr>` when no proxy headers are present.
pub fn with_rate_limit(router: Router, per_hour: u32) -> Result<Router, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "RATE_LIMIT_PER_HOUR",
        value: per_hour.to_string(),
    };
    if per_hour == 0 {
        return Err(invalid());
    }

    // One request replenished every 3600/per_hour seconds, bursts up to the hourly quota
    let replenish_seconds = u64::from((3600 / per_hour).max(1));
    let governor_config = GovernorConfigBuilder::default()
        .per_second(replenish_seconds)
        .burst_size(per_hour)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(invalid)?;

    // The layer borrows its config for the life of the process
    Ok(router.layer(GovernorLayer {
        config: Box::leak(Box::new(governor_config)),
    }))
}
