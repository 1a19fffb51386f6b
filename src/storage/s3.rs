use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, primitives::ByteStream, Client as S3Client};
use log::info;

use super::{validate_key, FileStorage};
use crate::core::config::DriveConfig;
use crate::core::shared::error::ApiError;

pub struct S3Storage {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub async fn new(config: &DriveConfig) -> Self {
        let endpoint = if !config.server.ends_with('/') {
            format!("{}/", config.server)
        } else {
            config.server.clone()
        };
        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;
        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base: format!(
                "{}/{}",
                config.server.trim_end_matches('/'),
                config.bucket
            ),
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn save(&self, path: &str, data: Vec<u8>) -> Result<String, ApiError> {
        validate_key(path)?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| ApiError::Storage(format!("Failed to upload object: {}", e)))?;

        info!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, path);
        Ok(format!("{}/{}", self.public_base, path))
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        validate_key(path)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| ApiError::Storage(format!("Failed to delete object: {}", e)))?;
        Ok(())
    }
}
