use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REGION: &str = "ap-northeast-2";
const DEFAULT_STORAGE_DIR: &str = "./data/objects";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which object store the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Any S3-compatible service (AWS, MinIO, R2, ...).
    S3,
    /// Local directory, one file per object.
    Fs,
    /// Process-local map; contents vanish on restart.
    Memory,
}

/// Static credentials for the S3 backend.
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments. Built once at startup and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub bucket: String,
    pub region: String,
    /// Host suffix used for public URLs: `https://{bucket}.{public_endpoint}/{key}`.
    pub public_endpoint: String,
    /// Custom S3 API endpoint (MinIO, R2). `None` means AWS.
    pub endpoint_url: Option<String>,
    pub path_style: bool,
    /// `None` falls back to the default AWS credential chain.
    pub credentials: Option<StaticCredentials>,
    pub storage_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Public-URL upload gateway for S3-compatible object stores")]
pub struct Args {
    /// Host to bind to (overrides OBJECT_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides OBJECT_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Store backend (overrides OBJECT_GATEWAY_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<StoreBackend>,

    /// Bucket that receives uploads (overrides OBJECT_GATEWAY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Store region (overrides OBJECT_GATEWAY_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Host suffix for public URLs (overrides OBJECT_GATEWAY_PUBLIC_ENDPOINT)
    #[arg(long)]
    pub public_endpoint: Option<String>,

    /// Custom S3 API endpoint URL (overrides OBJECT_GATEWAY_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Use path-style S3 addressing (overrides OBJECT_GATEWAY_PATH_STYLE)
    #[arg(long)]
    pub path_style: bool,

    /// Directory for the fs backend (overrides OBJECT_GATEWAY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Directory for staging files (overrides OBJECT_GATEWAY_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Largest accepted file in bytes (overrides OBJECT_GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Defaults for everything except the bucket.
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            backend: StoreBackend::S3,
            bucket: bucket.into(),
            region: DEFAULT_REGION.into(),
            public_endpoint: default_public_endpoint(DEFAULT_REGION),
            endpoint_url: None,
            path_style: false,
            credentials: None,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            staging_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_sources(args, |name| env::var(name))
    }

    /// Merge parsed CLI args over values looked up through `lookup`.
    ///
    /// CLI wins over env, env wins over defaults.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let Some(bucket) = args.bucket.or(var("OBJECT_GATEWAY_BUCKET")?) else {
            bail!("a bucket is required (--bucket or OBJECT_GATEWAY_BUCKET)");
        };
        let mut cfg = Self::with_bucket(bucket);

        if let Some(host) = args.host.or(var("OBJECT_GATEWAY_HOST")?) {
            cfg.host = host;
        }
        cfg.port = match args.port {
            Some(port) => port,
            None => match var("OBJECT_GATEWAY_PORT")? {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing OBJECT_GATEWAY_PORT value `{}`", value))?,
                None => cfg.port,
            },
        };
        cfg.backend = match args.backend {
            Some(backend) => backend,
            None => match var("OBJECT_GATEWAY_BACKEND")? {
                Some(value) => StoreBackend::from_str(&value, true).map_err(|err| {
                    anyhow::anyhow!("parsing OBJECT_GATEWAY_BACKEND value `{}`: {}", value, err)
                })?,
                None => cfg.backend,
            },
        };
        if let Some(region) = args.region.or(var("OBJECT_GATEWAY_REGION")?) {
            cfg.region = region;
        }
        cfg.public_endpoint = args
            .public_endpoint
            .or(var("OBJECT_GATEWAY_PUBLIC_ENDPOINT")?)
            .unwrap_or_else(|| default_public_endpoint(&cfg.region));
        cfg.endpoint_url = args.endpoint_url.or(var("OBJECT_GATEWAY_ENDPOINT_URL")?);
        cfg.path_style = args.path_style
            || match var("OBJECT_GATEWAY_PATH_STYLE")? {
                Some(value) => parse_bool(&value)
                    .with_context(|| format!("parsing OBJECT_GATEWAY_PATH_STYLE value `{}`", value))?,
                None => false,
            };

        cfg.credentials = match (
            var("OBJECT_GATEWAY_ACCESS_KEY_ID")?,
            var("OBJECT_GATEWAY_SECRET_ACCESS_KEY")?,
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => bail!(
                "OBJECT_GATEWAY_ACCESS_KEY_ID and OBJECT_GATEWAY_SECRET_ACCESS_KEY must be set together"
            ),
        };

        if let Some(dir) = args
            .storage_dir
            .or(var("OBJECT_GATEWAY_STORAGE_DIR")?.map(PathBuf::from))
        {
            cfg.storage_dir = dir;
        }
        if let Some(dir) = args
            .staging_dir
            .or(var("OBJECT_GATEWAY_STAGING_DIR")?.map(PathBuf::from))
        {
            cfg.staging_dir = dir;
        }
        cfg.max_upload_bytes = match args.max_upload_bytes {
            Some(limit) => limit,
            None => match var("OBJECT_GATEWAY_MAX_UPLOAD_BYTES")? {
                Some(value) => value.parse::<usize>().with_context(|| {
                    format!("parsing OBJECT_GATEWAY_MAX_UPLOAD_BYTES value `{}`", value)
                })?,
                None => cfg.max_upload_bytes,
            },
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public URL of `key`. Deterministic; never touches the store.
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.{}/{}", self.bucket, self.public_endpoint, key)
    }
}

fn default_public_endpoint(region: &str) -> String {
    format!("s3.{}.amazonaws.com", region)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got `{}`", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn bucket_is_required() {
        let err = AppConfig::from_sources(Args::default(), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn env_values_fill_defaults() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            env_of(&[
                ("OBJECT_GATEWAY_BUCKET", "withmarket"),
                ("OBJECT_GATEWAY_PORT", "9000"),
                ("OBJECT_GATEWAY_BACKEND", "memory"),
                ("OBJECT_GATEWAY_REGION", "us-east-1"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.bucket, "withmarket");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.backend, StoreBackend::Memory);
        assert_eq!(cfg.public_endpoint, "s3.us-east-1.amazonaws.com");
        assert!(cfg.credentials.is_none());
    }

    #[test]
    fn cli_overrides_env() {
        let args = Args {
            bucket: Some("cli-bucket".into()),
            port: Some(7000),
            public_endpoint: Some("s3.example.com".into()),
            ..Args::default()
        };
        let cfg = AppConfig::from_sources(
            args,
            env_of(&[("OBJECT_GATEWAY_BUCKET", "env-bucket"), ("OBJECT_GATEWAY_PORT", "9000")]),
        )
        .unwrap();

        assert_eq!(cfg.bucket, "cli-bucket");
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.public_url("a/b.png"), "https://cli-bucket.s3.example.com/a/b.png");
    }

    #[test]
    fn bad_port_is_reported() {
        let err = AppConfig::from_sources(
            Args::default(),
            env_of(&[("OBJECT_GATEWAY_BUCKET", "b"), ("OBJECT_GATEWAY_PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("OBJECT_GATEWAY_PORT"));
    }

    #[test]
    fn credentials_must_come_in_pairs() {
        let err = AppConfig::from_sources(
            Args::default(),
            env_of(&[
                ("OBJECT_GATEWAY_BUCKET", "b"),
                ("OBJECT_GATEWAY_ACCESS_KEY_ID", "AKIA"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("set together"));
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            env_of(&[
                ("OBJECT_GATEWAY_BUCKET", "b"),
                ("OBJECT_GATEWAY_ACCESS_KEY_ID", "AKIA"),
                ("OBJECT_GATEWAY_SECRET_ACCESS_KEY", "super-secret"),
            ]),
        )
        .unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn path_style_accepts_common_booleans() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            env_of(&[("OBJECT_GATEWAY_BUCKET", "b"), ("OBJECT_GATEWAY_PATH_STYLE", "yes")]),
        )
        .unwrap();
        assert!(cfg.path_style);
    }
}
