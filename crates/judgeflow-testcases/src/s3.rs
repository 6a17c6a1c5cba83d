use crate::object_store::ObjectStore;
use crate::Error;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => {
                let bytes = resp.body.collect().await.map_err(|e| Error::Backend(e.to_string()))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                if e.as_service_error().map(|s| s.is_no_such_key()).unwrap_or(false) {
                    Ok(None)
                } else {
                    Err(Error::Backend(e.to_string()))
                }
            }
        }
    }

    async fn head(&self, key: &str) -> Result<Option<u64>, Error> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => Ok(resp.content_length.map(|n| n.max(0) as u64)),
            Err(e) => {
                if e.as_service_error().map(|s| s.is_not_found()).unwrap_or(false) {
                    Ok(None)
                } else {
                    Err(Error::Backend(e.to_string()))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(())
    }
}
