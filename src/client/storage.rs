//! File storage (`/storage/v1`).

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;

use super::{SupabaseClient, require_name};
use crate::error::Result;
use crate::models::{FileObject, ListOptions, RemoveRequest, UploadResponse};

impl SupabaseClient {
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<UploadResponse> {
        let _loading = self.loading.begin("Uploading file");
        let url = self.object_endpoint(&["storage", "v1", "object"], bucket, path)?;

        let builder = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        self.send_json(builder).await
    }

    pub async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let _loading = self.loading.begin("Downloading file");
        let url = self.object_endpoint(&["storage", "v1", "object"], bucket, path)?;

        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Delete objects; returns the objects the backend actually removed.
    pub async fn remove(&self, bucket: &str, paths: &[&str]) -> Result<Vec<FileObject>> {
        let _loading = self.loading.begin("Removing files");
        require_name("bucket", bucket)?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&["storage", "v1", "object", bucket])?;
        let builder = self
            .request(Method::DELETE, url)
            .json(&RemoveRequest { prefixes: paths });
        self.send_json(builder).await
    }

    pub async fn list(&self, bucket: &str, options: &ListOptions) -> Result<Vec<FileObject>> {
        let _loading = self.loading.begin("Listing files");
        require_name("bucket", bucket)?;
        let url = self.endpoint(&["storage", "v1", "object", "list", bucket])?;
        self.send_json(self.request(Method::POST, url).json(options)).await
    }

    /// URL of an object in a public bucket. No request is made.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        let url = self.object_endpoint(&["storage", "v1", "object", "public"], bucket, path)?;
        Ok(url.to_string())
    }
}
