//! Remote library API client
//!
//! The `RemoteLibrary` trait is the seam between the synchronizer and the
//! network; `HttpRemoteLibrary` is the reqwest-backed implementation of the
//! server's REST surface.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Claims;
use crate::error::{AppError, Result};

/// Authenticated session context
///
/// Established on login or registration, cleared on logout, and read before
/// every remote call. There is no ambient token storage.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Decode the token payload for display purposes only
    ///
    /// The signature is NOT checked here; authorization decisions belong to
    /// the server.
    pub fn claims(&self) -> Option<Claims> {
        let payload = self.token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// A book as the remote service reports it
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBook {
    pub id: i64,
    pub title: String,
    pub cloudinary_url: String,
    pub uploaded_at: String,
}

/// Result of a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub book_id: i64,
    pub title: String,
    pub url: String,
}

/// The remote library service, as seen by the synchronizer
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// List the session user's books
    async fn list_books(&self, session: &Session) -> Result<Vec<RemoteBook>>;

    /// Upload a PDF, returning the assigned id and hosted URL
    async fn upload(
        &self,
        session: &Session,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadReceipt>;

    /// Rename a book
    async fn rename(&self, session: &Session, book_id: &str, new_name: &str) -> Result<()>;

    /// Delete a book
    async fn delete(&self, session: &Session, book_id: &str) -> Result<()>;

    /// Fetch a hosted binary by URL (hydration)
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP implementation of `RemoteLibrary`
pub struct HttpRemoteLibrary {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct AuthBody {
    token: String,
}

impl HttpRemoteLibrary {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register a new account and establish a session
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/api/auth/register", self.base_url))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await?;

        let body: AuthBody = Self::check(response).await?.json().await?;
        Ok(Session::new(body.token))
    }

    /// Log in and establish a session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: AuthBody = Self::check(response).await?.json().await?;
        Ok(Session::new(body.token))
    }

    /// Turn a non-2xx response into a `Remote` error carrying the server's message
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string());

        Err(AppError::Remote(message))
    }
}

#[async_trait]
impl RemoteLibrary for HttpRemoteLibrary {
    async fn list_books(&self, session: &Session) -> Result<Vec<RemoteBook>> {
        let response = self
            .http
            .get(format!("{}/api/my-books", self.base_url))
            .bearer_auth(session.token())
            .send()
            .await?;

        let books = Self::check(response).await?.json().await?;
        Ok(books)
    }

    async fn upload(
        &self,
        session: &Session,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/upload", self.base_url))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await?;

        let receipt = Self::check(response).await?.json().await?;
        Ok(receipt)
    }

    async fn rename(&self, session: &Session, book_id: &str, new_name: &str) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/api/books/{}/rename", self.base_url, book_id))
            .bearer_auth(session.token())
            .json(&json!({ "newName": new_name }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, book_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/api/books/{}", self.base_url, book_id))
            .bearer_auth(session.token())
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
