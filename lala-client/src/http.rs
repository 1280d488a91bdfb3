//! Bearer-authenticated JSON transport for the platform API.

use crate::error::{ClientError, ClientResult};
use lala_auth::SessionManager;
use lala_core::config::ENV_API_BASE;
use lala_core::ClientConfig;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// HTTP client for the platform API.
///
/// Every request carries `Authorization: Bearer <id_token>` while a token is
/// stored; without one the request goes out unauthenticated and public
/// routes still answer.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    session: SessionManager,
}

impl ApiClient {
    /// Create a client for the API rooted at `base`.
    pub fn new(base: Url, session: SessionManager) -> Self {
        Self::with_client(Client::new(), base, session)
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client, base: Url, session: SessionManager) -> Self {
        Self {
            client,
            base,
            session,
        }
    }

    /// Create from `LALA_API_BASE` settings.
    pub fn from_config(config: &ClientConfig, session: SessionManager) -> ClientResult<Self> {
        let base = config
            .api_base
            .clone()
            .ok_or(ClientError::NotConfigured(ENV_API_BASE))?;
        Ok(Self::new(base, session))
    }

    /// The API base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The session supplying bearer tokens.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Resolve a path such as `/leaderboard` against the base URL.
    pub fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Start a request with the bearer header attached.
    pub fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "Making API request");

        let mut request = self.client.request(method, url);
        if let Some(bearer) = self.session.bearer_authorization() {
            request = request.header(reqwest::header::AUTHORIZATION, bearer);
        }
        Ok(request)
    }

    /// GET a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.get_json_with_query(path, &[] as &[(&str, &str)]).await
    }

    /// GET a JSON resource with query parameters.
    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path)?.query(query);
        read_json(request.send().await?).await
    }

    /// Send a JSON body and read a JSON response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path)?.json(body);
        read_json(request.send().await?).await
    }
}

/// Turn a non-success response into [`ClientError::Api`].
pub(crate) async fn check_response(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::api(status.as_u16(), body))
}

/// Check the status, then decode the body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check_response(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session, session_with_token};
    use serde_json::{json, Value};
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, session: SessionManager) -> ApiClient {
        let base = Url::parse(&format!("{}/prod/", server.uri())).unwrap();
        ApiClient::new(base, session)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prod/profile"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, session_with_token("tok-1"));
        let body: Value = api.get_json("/profile").await.unwrap();
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_signed_out_requests_are_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/prod/public"))
            .and(query_param("x", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let api = client(&server, session());
        let body: Value = api
            .get_json_with_query("public", &[("x", "1")])
            .await
            .unwrap();
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad input"))
            .mount(&server)
            .await;

        let api = client(&server, session());
        let err = api
            .send_json::<_, Value>(Method::POST, "items", &json!({ "a": 1 }))
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad input");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_config_requires_base() {
        let err = ApiClient::from_config(&ClientConfig::new(), session()).unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured(ENV_API_BASE)));
    }

    #[test]
    fn test_url_joins_under_base() {
        let base = Url::parse("https://api.example.com/prod/").unwrap();
        let api = ApiClient::new(base, session());
        assert_eq!(
            api.url("/leaderboard").unwrap().as_str(),
            "https://api.example.com/prod/leaderboard"
        );
    }
}
