//! OAuth 2.0 app-only authentication.
//!
//! The consumer key and secret are percent-encoded (RFC 1738), joined with a
//! colon, and sent base64-encoded as HTTP Basic credentials to
//! `POST /oauth2/token` with `grant_type=client_credentials`.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    Url,
    header::{AUTHORIZATION, HeaderValue},
};

use crate::{
    error::{TwitterError, TwitterResult},
    transport::ApiRequest,
    types::TokenResponse,
};

/// API name used in errors for the token call.
pub(crate) const TOKEN_API: &str = "oauth2_token";

/// Everything except RFC 3986 unreserved characters.
const CREDENTIAL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Value of the `Authorization` header for the token request.
#[must_use]
pub fn basic_credentials(consumer_key: &str, consumer_secret: &str) -> String {
    let key = utf8_percent_encode(consumer_key, CREDENTIAL_ENCODE_SET);
    let secret = utf8_percent_encode(consumer_secret, CREDENTIAL_ENCODE_SET);
    format!("Basic {}", BASE64.encode(format!("{key}:{secret}")))
}

/// Build the token request for `url` (`<api_url>/oauth2/token`).
pub(crate) fn token_request(
    url: Url,
    consumer_key: &str,
    consumer_secret: &str,
) -> TwitterResult<ApiRequest> {
    if consumer_key.is_empty() || consumer_secret.is_empty() {
        return Err(TwitterError::Config(
            "consumer_key and consumer_secret must not be empty".into(),
        ));
    }

    let mut auth = HeaderValue::from_str(&basic_credentials(consumer_key, consumer_secret))
        .map_err(|_| TwitterError::Config("consumer credentials are not valid header text".into()))?;
    auth.set_sensitive(true);

    Ok(ApiRequest::post(url)
        .header(AUTHORIZATION, auth)
        .form(&[("grant_type", "client_credentials")]))
}

/// Extract the bearer token, rejecting any other token type.
pub(crate) fn bearer_from_response(response: TokenResponse) -> TwitterResult<String> {
    if !response.token_type.eq_ignore_ascii_case("bearer") {
        return Err(TwitterError::Config(format!(
            "unexpected token type: {}",
            response.token_type
        )));
    }
    if response.access_token.is_empty() {
        return Err(TwitterError::Config("empty access token".into()));
    }
    Ok(response.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TwitterApiClient, TwitterConfig};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string, header, method, path},
    };

    #[test]
    fn test_basic_credentials_encoding() {
        // Example pair from the platform's app-only auth guide.
        let value = basic_credentials(
            "xvz1evFS4wEEPTGEFPHBog",
            "L8qq9PZyRg6ieKGEKhZolGC0vJWLw8iEJ88DRdyOg",
        );
        assert_eq!(
            value,
            "Basic eHZ6MWV2RlM0d0VFUFRHRUZQSEJvZzpMOHFxOVBaeVJnNmllS0dFS2hab2xHQzB2SldMdzhpRUo4OERSZHlPZw=="
        );
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let value = basic_credentials("a:b", "c d");
        let decoded = BASE64.decode(value.trim_start_matches("Basic ")).unwrap();
        assert_eq!(decoded, b"a%3Ab:c%20d");
    }

    #[test]
    fn test_rejects_non_bearer_token_type() {
        let response = TokenResponse {
            token_type: "mac".into(),
            access_token: "x".into(),
        };
        assert!(bearer_from_response(response).unwrap_err().is_config());
    }

    #[tokio::test]
    async fn test_authenticate_fetches_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("Authorization", basic_credentials("key", "secret").as_str()))
            .and(body_string("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "bearer",
                "access_token": "AAAA%2FAAA"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = TwitterApiClient::new(TwitterConfig {
            consumer_key: Some("key".into()),
            consumer_secret: Some("secret".into()),
            api_url: mock_server.uri(),
            ..Default::default()
        })
        .unwrap();

        client.authenticate().await.unwrap();
        assert_eq!(client.bearer_token(), Some("AAAA%2FAAA"));

        // A second call is a no-op.
        client.authenticate().await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_without_credentials() {
        let mut client = TwitterApiClient::new(TwitterConfig::default()).unwrap();
        assert!(client.authenticate().await.unwrap_err().is_config());
    }
}
