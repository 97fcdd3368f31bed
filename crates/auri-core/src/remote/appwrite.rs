//! Appwrite REST adapter for the review store and auth contracts.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{RemoteAuthService, RemoteError, RemoteResult, RemoteReviewStore};
use crate::config::AppwriteConfig;
use crate::connectivity::ReachabilityProbe;
use crate::error::{Error, Result};
use crate::models::{Credentials, Identity, Rating, Review, ReviewId, ReviewPatch};
use crate::util::{compact_text, normalize_text_option};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const UNIQUE_ID: &str = "unique()";

/// Single client object for the Appwrite backend.
///
/// Clones share the HTTP connection pool and the session cookie jar.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    config: AppwriteConfig,
    http: reqwest::Client,
    cookies: Arc<Jar>,
    base_url: Url,
}

impl AppwriteClient {
    pub fn new(config: AppwriteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint).map_err(|error| {
            Error::Configuration(format!("invalid Appwrite endpoint: {error}"))
        })?;
        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| {
                Error::Configuration(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            config,
            http,
            cookies,
            base_url,
        })
    }

    pub const fn config(&self) -> &AppwriteConfig {
        &self.config
    }

    /// `Cookie` header value the client would send to the endpoint, if any.
    ///
    /// Lets short-lived processes carry the remote session across runs.
    pub fn session_cookies(&self) -> Option<String> {
        self.cookies
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(ToString::to_string))
    }

    /// Seed the jar with a value previously returned by
    /// [`session_cookies`](Self::session_cookies).
    pub fn restore_session_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            self.cookies.add_cookie_str(pair, &self.base_url);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.endpoint)
    }

    fn documents_path(&self) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(&self.config.database_id),
            urlencoding::encode(&self.config.reviews_collection_id)
        )
    }

    fn document_path(&self, id: &ReviewId) -> RemoteResult<String> {
        if !is_valid_document_id(id.as_str()) {
            // Local placeholders and garbage never exist remotely.
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(format!(
            "{}/{}",
            self.documents_path(),
            urlencoding::encode(id.as_str())
        ))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|error| RemoteError::Unavailable(error.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &parse_api_error(status, &body)))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> RemoteResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|error| RemoteError::Unavailable(format!("malformed response: {error}")))
    }

    async fn fetch_document(&self, id: &ReviewId) -> RemoteResult<Review> {
        let path = self.document_path(id)?;
        let document: ReviewDocument = self
            .send_json(self.request(Method::GET, &path))
            .await
            .map_err(|error| not_found_as(error, id))?;
        document.try_into()
    }

    async fn create_email_session(&self, credentials: &Credentials) -> RemoteResult<()> {
        let payload = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });

        let primary = self
            .send(
                self.request(Method::POST, "/account/sessions/email")
                    .json(&payload),
            )
            .await;

        match primary {
            Ok(_) => Ok(()),
            // Servers older than 1.5 only expose the legacy route.
            Err(RemoteError::NotFound(_)) => {
                tracing::debug!("Email session route missing; falling back to legacy route");
                self.send(self.request(Method::POST, "/account/sessions").json(&payload))
                    .await
                    .map(|_| ())
            }
            Err(error) => Err(error),
        }
    }
}

impl RemoteReviewStore for AppwriteClient {
    async fn list(&self) -> RemoteResult<Vec<Review>> {
        let order = serde_json::json!({ "method": "orderDesc", "attribute": "createdAt" });
        let limit = serde_json::json!({ "method": "limit", "values": [self.config.list_limit] });
        let request = self
            .request(Method::GET, &self.documents_path())
            .query(&[("queries[]", order.to_string()), ("queries[]", limit.to_string())]);

        let response: DocumentList = self.send_json(request).await?;
        let total = response.documents.len();
        let reviews = response
            .documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id.clone();
                Review::try_from(document)
                    .map_err(|error| {
                        tracing::warn!("Skipping malformed review document {}: {}", id, error);
                    })
                    .ok()
            })
            .collect::<Vec<_>>();
        tracing::debug!("Fetched {} of {} review documents", reviews.len(), total);
        Ok(reviews)
    }

    async fn create(&self, review: &Review) -> RemoteResult<Review> {
        let payload = serde_json::json!({
            "documentId": UNIQUE_ID,
            "data": ReviewPayload::from(review),
        });
        let document: ReviewDocument = self
            .send_json(
                self.request(Method::POST, &self.documents_path())
                    .json(&payload),
            )
            .await?;
        document.try_into()
    }

    async fn get(&self, id: &ReviewId) -> RemoteResult<Review> {
        self.fetch_document(id).await
    }

    async fn update(&self, id: &ReviewId, patch: &ReviewPatch) -> RemoteResult<Review> {
        let path = self.document_path(id)?;
        let payload = serde_json::json!({
            "data": {
                "rating": patch.rating.get(),
                "message": patch.message,
            }
        });
        let document: ReviewDocument = self
            .send_json(self.request(Method::PATCH, &path).json(&payload))
            .await
            .map_err(|error| not_found_as(error, id))?;
        document.try_into()
    }

    async fn delete(&self, id: &ReviewId) -> RemoteResult<()> {
        let path = self.document_path(id)?;
        self.send(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
            .map_err(|error| not_found_as(error, id))
    }
}

impl RemoteAuthService for AppwriteClient {
    async fn current_identity(&self) -> RemoteResult<Option<Identity>> {
        match self
            .send_json::<AccountDocument>(self.request(Method::GET, "/account"))
            .await
        {
            Ok(account) => Ok(Some(account.into())),
            Err(RemoteError::Forbidden(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_session(&self, credentials: &Credentials) -> RemoteResult<Identity> {
        self.create_email_session(credentials)
            .await
            .map_err(|error| match error {
                RemoteError::Forbidden(_) => RemoteError::InvalidCredentials,
                other => other,
            })?;

        self.current_identity().await?.ok_or_else(|| {
            RemoteError::Unavailable("signed in but unable to load the account".to_string())
        })
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        name: &str,
    ) -> RemoteResult<Identity> {
        let payload = serde_json::json!({
            "userId": UNIQUE_ID,
            "email": credentials.email,
            "password": credentials.password,
            "name": name,
        });
        let account: AccountDocument = self
            .send_json(self.request(Method::POST, "/account").json(&payload))
            .await?;
        Ok(account.into())
    }

    async fn delete_current_session(&self) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, "/account/sessions/current"))
            .await
            .map(|_| ())
    }

    async fn delete_all_sessions(&self) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, "/account/sessions"))
            .await
            .map(|_| ())
    }
}

impl ReachabilityProbe for AppwriteClient {
    async fn is_reachable(&self) -> bool {
        match self.send(self.request(Method::GET, "/health/version")).await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Appwrite health probe failed: {}", error);
                false
            }
        }
    }
}

/// Appwrite custom ids: up to 36 chars of `a-z A-Z 0-9 . - _`, no leading
/// special character.
pub fn is_valid_document_id(id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,35}$").expect("Invalid regex"))
        .is_match(id)
}

fn classify_status(status: StatusCode, message: &str) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(message.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
            RemoteError::ValidationRejected(message.to_string())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Forbidden(message.to_string())
        }
        _ => RemoteError::Unavailable(message.to_string()),
    }
}

fn not_found_as(error: RemoteError, id: &ReviewId) -> RemoteError {
    match error {
        RemoteError::NotFound(_) => RemoteError::NotFound(id.to_string()),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AppwriteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.kind) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<ReviewDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "$createdAt", default)]
    system_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    verified: Option<bool>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    app_version: Option<String>,
    #[serde(default)]
    reported: Option<bool>,
}

/// Server documents are taken as stored: an empty message stays empty and a
/// blank `userId` reads as a guest review. Only a missing timestamp fails.
impl TryFrom<ReviewDocument> for Review {
    type Error = RemoteError;

    fn try_from(value: ReviewDocument) -> RemoteResult<Self> {
        let created_at = value
            .created_at
            .or(value.system_created_at)
            .ok_or_else(|| {
                RemoteError::Unavailable(format!("document {} has no creation time", value.id))
            })?;
        let owner_id = normalize_text_option(value.user_id).unwrap_or_default();

        Ok(Self {
            id: ReviewId::new(value.id),
            username: normalize_text_option(value.username)
                .unwrap_or_else(|| crate::models::GUEST_USERNAME.to_string()),
            rating: Rating::from_input(value.rating),
            message: value.message.unwrap_or_default(),
            verified: value.verified.unwrap_or(!owner_id.is_empty()),
            owner_id,
            created_at,
            app_version: normalize_text_option(value.app_version)
                .unwrap_or_else(|| crate::models::DEFAULT_APP_VERSION.to_string()),
            reported: value.reported.unwrap_or(false),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewPayload<'a> {
    username: &'a str,
    rating: u8,
    message: &'a str,
    user_id: &'a str,
    app_version: &'a str,
    verified: bool,
    reported: bool,
    created_at: String,
}

impl<'a> From<&'a Review> for ReviewPayload<'a> {
    fn from(review: &'a Review) -> Self {
        Self {
            username: &review.username,
            rating: review.rating.get(),
            message: &review.message,
            user_id: &review.owner_id,
            app_version: &review.app_version,
            verified: !review.owner_id.is_empty(),
            reported: false,
            created_at: review
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<AccountDocument> for Identity {
    fn from(value: AccountDocument) -> Self {
        Self {
            id: value.id,
            name: normalize_text_option(value.name),
            email: normalize_text_option(value.email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewInput, DEFAULT_APP_VERSION};

    fn client() -> AppwriteClient {
        let config = AppwriteConfig::new(
            "https://cloud.appwrite.io",
            "project",
            "main db",
            "reviews",
        )
        .unwrap();
        AppwriteClient::new(config).unwrap()
    }

    #[test]
    fn session_cookies_roundtrip_through_header() {
        let client = client();
        assert_eq!(client.session_cookies(), None);

        client.restore_session_cookies("a_session_project=abc; a_session_project_legacy=abc");
        let header = client.session_cookies().unwrap();
        assert!(header.contains("a_session_project=abc"));
        assert!(header.contains("a_session_project_legacy=abc"));
    }

    #[test]
    fn document_ids_follow_appwrite_rules() {
        assert!(is_valid_document_id("65a1f0c2e4b0"));
        assert!(is_valid_document_id("user.name_1-a"));
        assert!(!is_valid_document_id(""));
        assert!(!is_valid_document_id("_leading"));
        assert!(!is_valid_document_id(&"a".repeat(37)));
        assert!(!is_valid_document_id("local-0190c5f6-8d2a-7c3e-9f4b-1a2b3c4d5e6f"));
    }

    #[test]
    fn document_paths_are_encoded() {
        let client = client();
        assert_eq!(
            client.documents_path(),
            "/databases/main%20db/collections/reviews/documents"
        );
        assert_eq!(
            client.document_path(&ReviewId::from("r1")).unwrap(),
            "/databases/main%20db/collections/reviews/documents/r1"
        );
        assert!(matches!(
            client.document_path(&ReviewId::local()),
            Err(RemoteError::NotFound(_))
        ));
    }

    #[test]
    fn sparse_documents_map_leniently() {
        let document: ReviewDocument = serde_json::from_value(serde_json::json!({
            "$id": "r1",
            "$createdAt": "2024-03-01T10:00:00.000+00:00",
            "username": "  ",
            "message": "",
            "userId": " ",
        }))
        .unwrap();

        let review = Review::try_from(document).unwrap();
        assert_eq!(review.username, crate::models::GUEST_USERNAME);
        assert_eq!(review.message, "");
        assert_eq!(review.owner_id, "");
        assert!(!review.verified);
        assert_eq!(review.rating.get(), 5);
        assert_eq!(review.app_version, DEFAULT_APP_VERSION);
        assert_eq!(review.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn documents_without_timestamps_are_rejected() {
        let document: ReviewDocument =
            serde_json::from_value(serde_json::json!({ "$id": "r1", "message": "hi" })).unwrap();
        assert!(matches!(
            Review::try_from(document),
            Err(RemoteError::Unavailable(_))
        ));
    }

    #[test]
    fn status_codes_map_to_remote_errors() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "x"),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::CONFLICT, "x"),
            RemoteError::ValidationRejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "x"),
            RemoteError::Forbidden(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "x"),
            RemoteError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "x"),
            RemoteError::Unavailable(_)
        ));
    }

    #[test]
    fn api_error_prefers_message_field() {
        let body = r#"{"message":"Document not found","code":404,"type":"document_not_found"}"#;
        assert_eq!(
            parse_api_error(StatusCode::NOT_FOUND, body),
            "Document not found (404)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn document_converts_to_review() {
        let raw = r#"{
            "$id": "r1",
            "$createdAt": "2024-01-01T10:00:00.000+00:00",
            "username": "Sarah M.",
            "rating": 4,
            "message": "Calm and peaceful",
            "userId": "u1",
            "createdAt": "2024-01-02T00:00:00.000Z"
        }"#;
        let document: ReviewDocument = serde_json::from_str(raw).unwrap();
        let review = Review::try_from(document).unwrap();
        assert_eq!(review.id.as_str(), "r1");
        assert_eq!(review.owner_id, "u1");
        assert!(review.verified);
        assert_eq!(review.rating.get(), 4);
        assert_eq!(review.app_version, DEFAULT_APP_VERSION);
        assert_eq!(
            review.created_at,
            "2024-01-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn document_without_timestamps_is_rejected() {
        let document: ReviewDocument =
            serde_json::from_str(r#"{"$id":"r1","rating":5,"message":"x"}"#).unwrap();
        assert!(Review::try_from(document).is_err());
    }

    #[test]
    fn payload_uses_remote_field_names() {
        let draft = ReviewInput::new("Bo", Some(2), "meh").validate().unwrap();
        let review = Review::compose(&draft, Some(&Identity::new("u1")), "1.0");
        let value = serde_json::to_value(ReviewPayload::from(&review)).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["verified"], true);
        assert_eq!(value["rating"], 2);
        assert_eq!(value["appVersion"], "1.0");
        assert!(value["createdAt"].as_str().unwrap().ends_with('Z'));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn account_document_drops_blank_fields() {
        let account: AccountDocument =
            serde_json::from_str(r#"{"$id":"u1","name":"","email":"ana@example.com"}"#).unwrap();
        let identity = Identity::from(account);
        assert_eq!(identity.name, None);
        assert_eq!(identity.email.as_deref(), Some("ana@example.com"));
    }
}
