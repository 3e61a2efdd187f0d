use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use tracing::info;

use shelfsync_core::config::AwsConfig;

/// Build an S3 (or S3-compatible) store for one bucket.
///
/// With `AWS_ENDPOINT_URL` set the store talks path-style to that endpoint,
/// which is what MinIO expects.
pub fn build_s3_store(aws: &AwsConfig, bucket: &str) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
    let mut builder = AmazonS3Builder::new()
        .with_region(&aws.region)
        .with_bucket_name(bucket);

    if let Some(ref key) = aws.access_key_id {
        builder = builder.with_access_key_id(key);
    }
    if let Some(ref secret) = aws.secret_access_key {
        builder = builder.with_secret_access_key(secret);
    }
    if let Some(ref token) = aws.session_token {
        builder = builder.with_token(token);
    }

    if let Some(ref endpoint) = aws.endpoint_url {
        // object_store requires absolute URLs
        let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.clone()
        } else {
            format!("https://{}", endpoint)
        };
        builder = builder
            .with_endpoint(&endpoint_url)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(endpoint_url.starts_with("http://"));
    }

    let store = builder.build()?;

    info!(
        bucket,
        region = %aws.region,
        endpoint = aws.endpoint_url.as_deref().unwrap_or("aws"),
        "object store client ready"
    );

    Ok(Arc::new(store))
}
