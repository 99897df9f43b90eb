use indexmap::IndexMap;
use serde::Deserialize;

/// Scheme name -> scopes. A list of these is "any of"; one map is "all of".
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(rename = "bearerFormat")]
        bearer_format: Option<String>,
        description: Option<String>,
    },
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        in_: ApiKeyLocation,
        description: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 { description: Option<String> },
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        #[serde(rename = "openIdConnectUrl")]
        open_id_connect_url: Option<String>,
        description: Option<String>,
    },
}

#[cfg(test)]
mod test {
    use super::{ApiKeyLocation, SecurityScheme};

    #[test]
    fn parses_scheme_variants() {
        let bearer: SecurityScheme =
            serde_json::from_str(r#"{"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}"#)
                .unwrap();
        assert!(matches!(bearer, SecurityScheme::Http { ref scheme, .. } if scheme == "bearer"));

        let key: SecurityScheme =
            serde_json::from_str(r#"{"type": "apiKey", "in": "cookie", "name": "session"}"#)
                .unwrap();
        assert!(matches!(
            key,
            SecurityScheme::ApiKey { in_: ApiKeyLocation::Cookie, .. }
        ));

        let oauth: SecurityScheme =
            serde_json::from_str(r#"{"type": "oauth2", "flows": {"implicit": {}}}"#).unwrap();
        assert!(matches!(oauth, SecurityScheme::OAuth2 { .. }));
    }
}
