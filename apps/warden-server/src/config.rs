use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use warden_checks::CapabilityCheckConfig;
use warden_http::AuthConfig;

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `WARDEN__AUTH__STRIP_PREFIX=/api`.
pub const ENV_PREFIX: &str = "WARDEN__";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub auth: AuthConfig,
    pub capability_check: CapabilityCheckConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
            auth: AuthConfig::default(),
            capability_check: CapabilityCheckConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Layer defaults, then the YAML file if given, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong shape.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load server configuration")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.auth, AuthConfig::default());
    }

    #[test]
    fn yaml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "warden.yaml",
                r"
bind_addr: 0.0.0.0:9000
auth:
  strip_prefix: /api
capability_check:
  server: edge
  endpoints: ['^/v2/device', '^/v2/']
  error_out: true
",
            )?;
            jail.set_env("WARDEN__CAPABILITY_CHECK__SERVER", "from-env");

            let cfg = ServerConfig::load(Some(Path::new("warden.yaml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
            assert_eq!(cfg.auth.strip_prefix.as_deref(), Some("/api"));
            assert_eq!(cfg.auth.header_name, "Authorization");
            assert_eq!(cfg.capability_check.server, "from-env");
            assert_eq!(cfg.capability_check.endpoints, ["^/v2/device", "^/v2/"]);
            assert!(cfg.capability_check.error_out);
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ServerConfig::load(Some(Path::new("/nonexistent/warden.yaml"))).is_err());
    }
}
