//! Credentials presented by a connecting client.

use url::form_urlencoded;

/// What a client presented during the WebSocket handshake.
///
/// Clients may pass a token either as the `token` query parameter or as an
/// `Authorization: Bearer <token>` header; the header wins when both are
/// present. Guest connections pass only a `name` query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token, if any
    pub token: Option<String>,
    /// Requested display name for guest access
    pub name: Option<String>,
}

impl Credentials {
    /// Credentials carrying only a token.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            name: None,
        }
    }

    /// Credentials carrying only a guest name.
    pub fn guest(name: impl Into<String>) -> Self {
        Self {
            token: None,
            name: Some(name.into()),
        }
    }

    /// Extracts credentials from a request's query string and optional
    /// `Authorization` header value.
    pub fn from_parts(query: Option<&str>, authorization: Option<&str>) -> Self {
        let mut credentials = Self::default();

        let pairs = form_urlencoded::parse(query.unwrap_or_default().as_bytes());
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "token" => credentials.token = Some(value.into_owned()),
                "name" => credentials.name = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(token) = authorization
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            credentials.token = Some(token.to_string());
        }

        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_token_and_name_from_query() {
        let credentials = Credentials::from_parts(Some("token=abc123&name=Movie+Fan"), None);
        assert_eq!(credentials.token.as_deref(), Some("abc123"));
        assert_eq!(credentials.name.as_deref(), Some("Movie Fan"));
    }

    #[test]
    fn bearer_header_overrides_query_token() {
        let credentials =
            Credentials::from_parts(Some("token=from-query"), Some("Bearer from-header"));
        assert_eq!(credentials.token.as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_values_and_unknown_keys_are_ignored() {
        let credentials = Credentials::from_parts(Some("token=&party=p1&flag"), Some("Basic xyz"));
        assert_eq!(credentials, Credentials::default());
    }

    #[test]
    fn percent_escapes_are_decoded() {
        let credentials = Credentials::from_parts(Some("name=caf%C3%A9%20night&token=100%"), None);
        assert_eq!(credentials.name.as_deref(), Some("café night"));
        assert_eq!(credentials.token.as_deref(), Some("100%"));

        let credentials = Credentials::from_parts(Some("name=%zz"), None);
        assert_eq!(credentials.name.as_deref(), Some("%zz"));
    }

    #[test]
    fn last_repeated_key_wins() {
        let credentials = Credentials::from_parts(Some("name=first&name=second"), None);
        assert_eq!(credentials.name.as_deref(), Some("second"));
    }
}
