use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;

pub const TENANT_PARAM: &str = "tenant_id";
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Deserialize)]
struct TenantQuery {
    tenant_id: Option<String>,
}

/// Tenant identifier from the query string, then the `{tenant_id}` path
/// segment, then `X-Tenant-ID`. Blank values fall through to the next source.
pub fn resolve_tenant(
    uri: &Uri,
    path_params: &[(String, String)],
    headers: &HeaderMap,
) -> Option<String> {
    let from_query = Query::<TenantQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.tenant_id);
    let from_path = || {
        path_params
            .iter()
            .find(|(key, _)| key == TENANT_PARAM)
            .map(|(_, value)| value.clone())
    };
    let from_header = || {
        headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    non_blank(from_query)
        .or_else(|| non_blank(from_path()))
        .or_else(|| non_blank(from_header()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn path(tenant: &str) -> Vec<(String, String)> {
        vec![
            ("platform".into(), "whatsapp".into()),
            (TENANT_PARAM.into(), tenant.into()),
        ]
    }

    fn header(tenant: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static(tenant));
        headers
    }

    #[test]
    fn query_takes_precedence() {
        let uri: Uri = "/webhooks/whatsapp/path-t?tenant_id=query-t".parse().unwrap();
        let tenant = resolve_tenant(&uri, &path("path-t"), &header("header-t"));
        assert_eq!(tenant.as_deref(), Some("query-t"));
    }

    #[test]
    fn path_precedes_header() {
        let uri: Uri = "/webhooks/whatsapp/path-t".parse().unwrap();
        let tenant = resolve_tenant(&uri, &path("path-t"), &header("header-t"));
        assert_eq!(tenant.as_deref(), Some("path-t"));
    }

    #[test]
    fn header_is_last_resort() {
        let uri: Uri = "/webhooks/whatsapp?tenant_id=".parse().unwrap();
        let tenant = resolve_tenant(&uri, &[], &header("header-t"));
        assert_eq!(tenant.as_deref(), Some("header-t"));
    }

    #[test]
    fn absent_everywhere_is_none() {
        let uri: Uri = "/webhooks/whatsapp?other=1".parse().unwrap();
        assert_eq!(resolve_tenant(&uri, &[], &HeaderMap::new()), None);
    }
}
