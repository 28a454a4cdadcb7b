use super::handlers::{accounts, articles, comments, dashboard, index, media, profile, tags};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use domain::forms::ARTICLE_IMAGE_MAX_BYTES;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

// multipart 边界与其他字段的余量
const UPLOAD_BODY_LIMIT: usize = ARTICLE_IMAGE_MAX_BYTES + 1024 * 1024;

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let any = || {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(Any)
            .allow_headers(Any)
    };
    if allowed_origins == "*" {
        return any();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
        any()
    } else {
        tracing::info!("CORS enabled for origins: {:?}", origins);
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(origins)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origins);
    let media = ServeDir::new(&state.settings.server.media_root);

    let uploads = Router::new()
        .route("/api/articles/images", post(media::upload_article_image))
        .route("/api/profile/avatar", post(profile::upload_avatar))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .route("/api/articles", get(index::index).post(articles::publish_article))
        .route("/api/articles/:id", get(articles::article_detail))
        .route("/api/articles/:id/edit", post(articles::edit_article))
        .route("/api/articles/:id/delete", post(articles::delete_article))
        .route("/api/articles/:id/comments", post(comments::post_comment))
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/api/tags/:id/delete", post(tags::delete_tag))
        .route("/api/captcha", post(accounts::send_email_captcha))
        .route("/api/register", post(accounts::register))
        .route("/api/login", post(accounts::login))
        .route("/api/logout", post(accounts::logout))
        .route("/api/profile", get(profile::profile))
        .route("/api/dashboard", get(dashboard::dashboard))
        .merge(uploads)
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
