use anyhow::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::core::{EcfResult, StorageConfig};
use super::ObjectStorage;

/// Almacenamiento en S3 o un servicio compatible (R2, MinIO).
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint_url: Option<String>,
    cdn_url: Option<String>,
}

impl S3Storage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::default_provider()
            .or_else("us-east-1");

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(S3Storage {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            endpoint_url: config.endpoint_url.clone(),
            cdn_url: config.cdn_url.clone(),
        })
    }

    pub async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await?;

        Ok(self.public_url(key))
    }

    pub async fn get_object_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        let data = response.body.collect().await?;
        Ok(data.into_bytes().to_vec())
    }

    pub async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    // CDN si está configurado, si no la URL del bucket
    fn public_url(&self, key: &str) -> String {
        if let Some(cdn) = &self.cdn_url {
            format!("{}/{}", cdn.trim_end_matches('/'), key)
        } else if let Some(endpoint) = &self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> EcfResult<String> {
        Ok(self.put_object(key, data, content_type).await?)
    }

    async fn get(&self, key: &str) -> EcfResult<Vec<u8>> {
        Ok(self.get_object_bytes(key).await?)
    }

    async fn delete(&self, key: &str) -> EcfResult<()> {
        Ok(self.delete_object(key).await?)
    }
}
