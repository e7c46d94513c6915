use anyhow::{Context, Result};
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Create an object store scoped to a single bucket.
///
/// Without a DSN the bucket is opened on AWS S3 with credentials and region
/// taken from the standard `AWS_*` environment variables. A DSN redirects the
/// bucket to another backend:
///
/// - `s3://[access_key:secret_key@]host[:port]` for S3-compatible services
/// - `file:///path/to/root` where the bucket is a directory under the root
/// - `memory://` for an empty in-process store
pub fn create_bucket_store(bucket: &str, dsn: Option<&str>) -> Result<Arc<dyn ObjectStore>> {
    match dsn {
        Some(dsn) => create_object_store_from_dsn(dsn, bucket),
        None => {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .with_context(|| format!("Failed to create S3 client for bucket {bucket}"))?;
            Ok(Arc::new(store))
        }
    }
}

/// Create an object store for `bucket` from a DSN string
pub fn create_object_store_from_dsn(dsn: &str, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return Err(anyhow::anyhow!(
                    "File DSN must specify a path: file:///path/to/storage"
                ));
            }
            let bucket_dir = Path::new(path).join(bucket);
            let store = LocalFileSystem::new_with_prefix(&bucket_dir).with_context(|| {
                format!("Failed to open bucket directory {}", bucket_dir.display())
            })?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        "s3" => {
            let builder = create_s3_builder_from_dsn(&url, bucket)?;
            Ok(Arc::new(builder.build()?))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory, s3",
            scheme
        )),
    }
}

/// Create an S3 builder from a DSN
/// DSN format: s3://[access_key:secret_key@]host[:port]
pub fn create_s3_builder_from_dsn(dsn: &Url, bucket: &str) -> Result<AmazonS3Builder> {
    let host = dsn
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing S3 host in DSN"))?;
    let port = dsn.port();

    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

    let access_key = dsn.username();
    if !access_key.is_empty() {
        builder = builder
            .with_access_key_id(access_key)
            .with_secret_access_key(dsn.password().unwrap_or(""));
    }

    // Real S3 resolves its own endpoint, anything else (MinIO, Ceph) needs one
    if !host.contains("amazonaws.com") {
        let scheme = if port == Some(443) { "https" } else { "http" };
        let endpoint = match port {
            Some(p) => format!("{scheme}://{host}:{p}"),
            None => format!("{scheme}://{host}"),
        };
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(true)
            .with_virtual_hosted_style_request(false);
    }

    Ok(builder)
}
