pub mod chat;
pub mod config;
pub mod voice;

pub use chat::*;
pub use config::*;
pub use voice::*;

use crate::{error::AppError, health};
use actix_web::{web, HttpRequest, HttpResponse};

/// Register every gateway route.
///
/// API routes live under `/api/v1`; `/health` is repeated at the root for
/// load balancers.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
            .route("/config", web::get().to(get_config))
            .route("/config", web::put().to(update_config))
            .route("/chat", web::post().to(send_message))
            .route("/audio/convert", web::post().to(convert_audio))
            .route("/voice", web::post().to(voice_message)),
    )
    .route("/health", web::get().to(health::health_check));
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(format!(
        "No route for {} {}",
        req.method(),
        req.path()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::middleware::MetricsMiddleware;
    use crate::state::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_routes_and_fallback() {
        let state = AppState::new(AppConfig::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(MetricsMiddleware)
                .configure(configure_routes)
                .default_service(web::to(not_found)),
        )
        .await;

        for uri in ["/health", "/api/v1/health", "/api/v1/metrics", "/api/v1/config"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
        }

        let req = test::TestRequest::get().uri("/api/v1/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found");

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.endpoint_metrics["GET /api/v1/health"].request_count, 1);
        assert_eq!(metrics.error_count, 1);
    }
}
