use crate::{
    client::cli_client::GlusterCli,
    config::{BasicAuth, ExporterConfig},
    scrape::{sink::encode_text, Orchestrator, ScrapeCounters},
};
use actix_web::{http::header, HttpRequest, HttpResponse, Responder};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, warn};

/// Query parameter narrowing the collectors of a scrape.
const COLLECT_PARAM: &str = "collect[]";
const AUTH_REALM: &str = r#"Basic realm="metrics""#;

/// Handler for metrics. Runs a scrape of the cluster and serves the samples over Http.
pub(crate) async fn metrics_handler(request: HttpRequest) -> impl Responder {
    let config = ExporterConfig::get_config();
    if let Some(auth) = config.auth() {
        let credentials = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if !is_authorized(auth, credentials) {
            warn!(peer = ?request.peer_addr(), "Rejected metrics request with invalid credentials");
            return HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, AUTH_REALM))
                .body("Invalid username or password");
        }
    }

    let requested = requested_collectors(request.query_string());
    debug!(?requested, "collect query");
    let settings = config.scrape_settings().narrowed(requested.as_slice());
    let runner = GlusterCli::new(config.gluster_path().to_path_buf(), config.command_timeout());
    let families = Orchestrator::new(&runner, &settings, ScrapeCounters::global())
        .scrape()
        .await;

    HttpResponse::Ok()
        .insert_header(header::ContentType(mime::TEXT_PLAIN))
        .body(encode_text(&families))
}

/// Landing page linking the metrics path.
pub(crate) async fn landing_page() -> impl Responder {
    HttpResponse::Ok()
        .insert_header(header::ContentType(mime::TEXT_HTML))
        .body(landing_page_html(
            ExporterConfig::get_config().metrics_path(),
        ))
}

fn landing_page_html(metrics_path: &str) -> String {
    format!(
        "<html>\n<head><title>GlusterFS Exporter</title></head>\n<body>\n\
         <h1>GlusterFS Exporter</h1>\n<p><a href='{metrics_path}'>Metrics</a></p>\n\
         </body>\n</html>\n"
    )
}

/// Collector names given by the `collect[]` query parameters.
fn requested_collectors(query: &str) -> Vec<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == COLLECT_PARAM)
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// Checks an `Authorization` header value against the configured credentials.
fn is_authorized(auth: &BasicAuth, header_value: Option<&str>) -> bool {
    let Some(encoded) = header_value.and_then(|value| value.strip_prefix("Basic ")) else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    decoded
        .split_once(':')
        .map_or(false, |(user, password)| auth.matches(user, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_query() {
        assert_eq!(
            requested_collectors("collect[]=profile&collect%5B%5D=quota&other=peer"),
            vec!["profile".to_string(), "quota".to_string()]
        );
        assert!(requested_collectors("").is_empty());
    }

    #[test]
    fn basic_auth() {
        let auth = BasicAuth::new(Some("prometheus".into()), Some("s3cr:et".into())).unwrap();
        let header = format!("Basic {}", STANDARD.encode("prometheus:s3cr:et"));
        assert!(is_authorized(&auth, Some(&header)));

        let wrong = format!("Basic {}", STANDARD.encode("prometheus:nope"));
        assert!(!is_authorized(&auth, Some(&wrong)));
        assert!(!is_authorized(&auth, Some("Bearer token")));
        assert!(!is_authorized(&auth, Some("Basic !!!")));
        assert!(!is_authorized(&auth, None));
    }

    #[test]
    fn landing_page_links_metrics() {
        assert!(landing_page_html("/metrics").contains("<a href='/metrics'>Metrics</a>"));
    }
}
