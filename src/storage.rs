use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::SignedUploadResponse;

/// StorageService
///
/// The abstract contract for the object storage layer. The concrete client
/// talks to the Supabase Storage API with the service-role key; tests swap in
/// the in-memory mock without touching the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Whether a bucket with this name exists. Checked before signing an
    /// upload so the client gets a clear 400 instead of a signing failure.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ApiError>;

    /// Creates a short-lived signed upload token for an object path in the
    /// bucket. The client completes the upload directly against storage,
    /// bypassing this server.
    async fn create_signed_upload(
        &self,
        bucket: &str,
        file_name: &str,
    ) -> Result<SignedUploadResponse, ApiError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

#[derive(Debug, Deserialize)]
struct BucketInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SignedUploadUrl {
    url: String,
}

/// SupabaseStorageClient
///
/// Talks to the project's Storage API over HTTP. Every request carries the
/// service-role key in both the Authorization and apikey headers, which is
/// what the Storage gateway expects from server-side callers.
#[derive(Clone)]
pub struct SupabaseStorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStorageClient {
    pub fn new(supabase_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/storage/v1", supabase_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

#[async_trait]
impl StorageService for SupabaseStorageClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ApiError> {
        let buckets: Vec<BucketInfo> = self
            .authed(self.client.get(format!("{}/bucket", self.base_url)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(buckets.iter().any(|b| b.name == bucket))
    }

    async fn create_signed_upload(
        &self,
        bucket: &str,
        file_name: &str,
    ) -> Result<SignedUploadResponse, ApiError> {
        let signed: SignedUploadUrl = self
            .authed(self.client.post(format!(
                "{}/object/upload/sign/{}/{}",
                self.base_url, bucket, file_name
            )))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The gateway answers with a relative URL carrying the token as a
        // query parameter; the client only needs the token and the path.
        let token = signed
            .url
            .split_once("token=")
            .map(|(_, token)| token.to_string())
            .ok_or_else(|| {
                ApiError::Upstream("Failed to create signed upload URL".to_string())
            })?;

        Ok(SignedUploadResponse {
            path: file_name.to_string(),
            token,
        })
    }
}

/// MockStorageService
///
/// In-memory stand-in for unit and integration tests: a fixed bucket list
/// and deterministic tokens, with an optional simulated failure mode.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub buckets: Vec<String>,
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn with_buckets(buckets: &[&str]) -> Self {
        Self {
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            buckets: Vec::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ApiError> {
        if self.should_fail {
            return Err(ApiError::Upstream("mock storage failure".to_string()));
        }
        Ok(self.buckets.iter().any(|b| b == bucket))
    }

    async fn create_signed_upload(
        &self,
        bucket: &str,
        file_name: &str,
    ) -> Result<SignedUploadResponse, ApiError> {
        if self.should_fail {
            return Err(ApiError::Upstream("mock storage failure".to_string()));
        }
        Ok(SignedUploadResponse {
            path: file_name.to_string(),
            token: format!("mock-token-{}-{}", bucket, file_name),
        })
    }
}
