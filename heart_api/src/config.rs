use axum::http::HeaderValue;
use serde::Deserialize;
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use crate::error::ConfigError;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// JSON tree-ensemble artifact.
    #[default]
    Forest,
    /// TorchScript export plus a layout meta file (`torch` feature).
    #[serde(rename = "torchscript")]
    TorchScript,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub meta_path: Option<PathBuf>,
    pub backend: Backend,
    pub host: IpAddr,
    pub port: u16,
    /// `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/rf_heart_model.json"),
            meta_path: None,
            backend: Backend::Forest,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()
    }

    /// Every CORS entry must be `*` or usable as an `Origin` header value.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if let Some(bad) = self
            .cors_origins
            .iter()
            .find(|o| o.as_str() != "*" && o.parse::<HeaderValue>().is_err())
        {
            return Err(ConfigError::Value {
                key: "CORS_ORIGINS",
                value: bad.clone(),
            });
        }
        Ok(self)
    }

    /// `HEART_CONFIG` file (if set), then individual variable overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("HEART_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("META_PATH") {
            self.meta_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MODEL_BACKEND") {
            self.backend = match v.trim().to_ascii_lowercase().as_str() {
                "forest" => Backend::Forest,
                "torchscript" | "torch" => Backend::TorchScript,
                _ => return Err(ConfigError::Value { key: "MODEL_BACKEND", value: v }),
            };
        }
        if let Some(v) = lookup("HOST") {
            self.host = v
                .parse()
                .map_err(|_| ConfigError::Value { key: "HOST", value: v.clone() })?;
        }
        if let Some(v) = lookup("PORT") {
            self.port = v
                .parse()
                .map_err(|_| ConfigError::Value { key: "PORT", value: v.clone() })?;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        self.validate()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_serve_bundled_forest_on_8000() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.backend, Backend::Forest);
        assert_eq!(cfg.bind_addr().port(), 8000);
        assert_eq!(cfg.cors_origins, vec!["*"]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: ServiceConfig =
            serde_json::from_str(r#"{"port": 9100, "backend": "torchscript"}"#).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.backend, Backend::TorchScript);
        assert_eq!(cfg.model_path, PathBuf::from("model/rf_heart_model.json"));
    }

    #[test]
    fn overrides_apply_and_validate() {
        let env: HashMap<&str, &str> = [
            ("MODEL_PATH", "/srv/model.json"),
            ("PORT", "8081"),
            ("HOST", "127.0.0.1"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]
        .into_iter()
        .collect();
        let cfg = ServiceConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.json"));
        assert_eq!(cfg.bind_addr().to_string(), "127.0.0.1:8081");
        assert_eq!(cfg.cors_origins, vec!["http://a.test", "http://b.test"]);

        let bad = ServiceConfig::default()
            .with_overrides(|k| (k == "PORT").then(|| "eighty".to_string()));
        assert!(matches!(bad, Err(ConfigError::Value { key: "PORT", .. })));
    }

    #[test]
    fn unusable_cors_origin_is_rejected() {
        let bad = ServiceConfig::default()
            .with_overrides(|k| (k == "CORS_ORIGINS").then(|| "http://ok.test,http://bad\norigin".to_string()));
        match bad {
            Err(ConfigError::Value { key, value }) => {
                assert_eq!(key, "CORS_ORIGINS");
                assert_eq!(value, "http://bad\norigin");
            }
            other => panic!("expected CORS_ORIGINS error, got {other:?}"),
        }
    }

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("heart_api_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_reads_config_file() {
        let path = scratch_file(
            "ok.json",
            r#"{"model_path": "/srv/rf.json", "port": 9001, "cors_origins": ["http://a.test"]}"#,
        );
        let cfg = ServiceConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("/srv/rf.json"));
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.cors_origins, vec!["http://a.test"]);
        assert_eq!(cfg.backend, Backend::Forest);
    }

    #[test]
    fn load_reports_io_and_parse_errors() {
        let missing = std::env::temp_dir().join("heart_api_no_such_config.json");
        assert!(matches!(ServiceConfig::load(&missing), Err(ConfigError::Io { .. })));

        let path = scratch_file("broken.json", r#"{"port": "not a port"}"#);
        let err = ServiceConfig::load(&path);
        fs::remove_file(&path).unwrap();
        match err {
            Err(ConfigError::Parse { path: shown, .. }) => assert!(shown.contains("broken.json")),
            other => panic!("expected parse error, got {other:?}"),
        }

        let path = scratch_file("bad_origin.json", "{\"cors_origins\": [\"http://x\\u0000y\"]}");
        let err = ServiceConfig::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, Err(ConfigError::Value { key: "CORS_ORIGINS", .. })));
    }
}
