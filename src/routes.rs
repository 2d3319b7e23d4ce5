use crate::{
    api::{attendance, qr_code, report},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(burst)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let auth_limiter = Arc::new(build_limiter(config.rate_auth_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed JSON, bad coordinates and inverted check-in pairs all surface here
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/logout")
                .wrap(auth_limiter)
                .route(web::post().to(handlers::logout)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/verify-location")
                            .route(web::post().to(attendance::verify_location)),
                    )
                    .service(web::resource("/status").route(web::post().to(attendance::classify)))
                    .service(web::resource("/scan").route(web::post().to(attendance::scan)))
                    .service(
                        web::resource("/history").route(web::post().to(attendance::history)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("/attendance")
                            .route(web::post().to(report::attendance_report)),
                    )
                    .service(
                        web::resource("/summary").route(web::post().to(report::summary_report)),
                    )
                    .service(web::resource("/salary").route(web::post().to(report::salary))),
            )
            .service(
                web::scope("/admin")
                    // /admin/qr-codes
                    .service(
                        web::resource("/qr-codes")
                            .route(web::get().to(qr_code::list_qr_codes))
                            .route(web::post().to(qr_code::create_qr_code)),
                    )
                    // /admin/qr-codes/{id}
                    .service(
                        web::resource("/qr-codes/{id}")
                            .route(web::delete().to(qr_code::deactivate_qr_code)),
                    )
                    .service(
                        web::resource("/dashboard/stats").route(web::post().to(report::dashboard)),
                    ),
            ),
    );
}
