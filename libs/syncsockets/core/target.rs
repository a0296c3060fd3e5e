use crate::traits::{Result, SyncError};
use url::Url;

/// Build the connection URL: `base` plus `userId` and optional `token`
///
/// Existing query parameters on `base` are kept; `userId`/`token` replace any
/// previous values with the same name.
pub fn connection_url(base: &str, user_id: &str, token: Option<&str>) -> Result<String> {
    let mut url = parse_endpoint(base)?;

    if user_id.is_empty() {
        return Err(SyncError::Configuration("userId must not be empty".to_string()));
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "userId" && key != "token")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(kept);
        query.append_pair("userId", user_id);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            query.append_pair("token", token);
        }
    }

    Ok(url.into())
}

/// Parse and check a base endpoint
pub fn parse_endpoint(base: &str) -> Result<Url> {
    let url = Url::parse(base.trim())
        .map_err(|e| SyncError::Configuration(format!("Invalid endpoint '{}': {}", base, e)))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(SyncError::Configuration(format!(
            "Unsupported endpoint scheme '{}'; expected ws or wss",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_user_and_token() {
        let url = connection_url("wss://rt.example.com/ws", "u-42", Some("t0k")).unwrap();
        assert_eq!(url, "wss://rt.example.com/ws?userId=u-42&token=t0k");
    }

    #[test]
    fn test_token_is_optional_and_values_are_encoded() {
        let url = connection_url("ws://localhost:3001", "jane doe&co", None).unwrap();
        assert_eq!(url, "ws://localhost:3001/?userId=jane+doe%26co");

        let url = connection_url("ws://localhost:3001", "u1", Some("")).unwrap();
        assert!(!url.contains("token"));
    }

    #[test]
    fn test_existing_query_is_kept_and_identity_replaced() {
        let url = connection_url("wss://rt.example.com/ws?v=2&userId=old", "u1", None).unwrap();
        assert_eq!(url, "wss://rt.example.com/ws?v=2&userId=u1");
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            connection_url("not a url", "u1", None),
            Err(SyncError::Configuration(_))
        ));
        assert!(matches!(
            connection_url("https://rt.example.com", "u1", None),
            Err(SyncError::Configuration(_))
        ));
        assert!(matches!(
            connection_url("wss://rt.example.com", "", None),
            Err(SyncError::Configuration(_))
        ));
    }
}
