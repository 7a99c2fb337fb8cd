use crate::ServerError;
use axum::http::{HeaderName, HeaderValue, Method};
use hostmcp_config::CorsConfig;
use log::debug;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

/// Build the CORS layer once, at bind time.
///
/// A literal `*` is not allowed together with credentials, so wildcard
/// origins and headers are answered by mirroring the request instead.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, ServerError> {
    let methods = config
        .allow_methods
        .iter()
        .map(|method| {
            Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|err| ServerError::Cors(format!("method {method}: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let expose = header_names(&config.expose_headers)?;

    let origin = match (config.allows_any_origin(), config.allow_credentials) {
        (true, true) => AllowOrigin::mirror_request(),
        (true, false) => AllowOrigin::from(Any),
        (false, _) => {
            let origins = config
                .allow_origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|err| ServerError::Cors(format!("origin {origin}: {err}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(origins)
        }
    };
    let headers = match (config.allows_any_header(), config.allow_credentials) {
        (true, true) => AllowHeaders::mirror_request(),
        (true, false) => AllowHeaders::from(Any),
        (false, _) => AllowHeaders::list(header_names(&config.allow_headers)?),
    };
    debug!(
        "cors policy built (origins={:?}, methods={:?}, credentials={})",
        config.allow_origins, config.allow_methods, config.allow_credentials
    );
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
        .allow_credentials(config.allow_credentials))
}

fn header_names(names: &[String]) -> Result<Vec<HeaderName>, ServerError> {
    names
        .iter()
        .map(|name| {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ServerError::Cors(format!("header {name}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_builds() {
        assert!(cors_layer(&CorsConfig::default()).is_ok());
    }

    #[test]
    fn explicit_origins_without_credentials_build() {
        let config = CorsConfig {
            allow_origins: vec!["http://localhost:3000".to_string()],
            allow_headers: vec!["content-type".to_string()],
            allow_credentials: false,
            ..CorsConfig::default()
        };
        assert!(cors_layer(&config).is_ok());
    }

    #[test]
    fn bad_header_name_is_rejected() {
        let config = CorsConfig {
            expose_headers: vec!["bad header".to_string()],
            ..CorsConfig::default()
        };
        assert!(matches!(cors_layer(&config), Err(ServerError::Cors(_))));
    }
}
