use crate::config::ExporterConfig;
use actix_web::web;
/// module for prometheus handlers.
mod handler;

pub(crate) fn metric_route(cfg: &mut web::ServiceConfig) {
    let metrics_path = ExporterConfig::get_config().metrics_path();
    cfg.route(metrics_path, web::get().to(handler::metrics_handler))
        .route("/", web::get().to(handler::landing_page));
}
