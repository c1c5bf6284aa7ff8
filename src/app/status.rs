use lockgate::config::{Config, SigningConfig};
use lockgate::security::load_signing_key;

/// Describe where the signing key would come from, without generating one.
fn signing_key_line(signing: &SigningConfig) -> String {
    let lookup = SigningConfig {
        generate_if_missing: false,
        ..signing.clone()
    };
    match load_signing_key(&lookup) {
        Ok(Some(key)) => format!("loaded (key id {})", key.key_id()),
        Ok(None) if signing.generate_if_missing => {
            "not present (generated on first issuing command)".to_string()
        }
        Ok(None) => "not configured".to_string(),
        Err(e) => format!("error: {e}"),
    }
}

pub fn render_status(config: &Config) -> String {
    let mut lines = vec![
        "◆ lockgate status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        String::new(),
        format!("  Token TTL        {}s", config.token_ttl_secs),
        format!("  Rule timeout     {}ms", config.rule_timeout_ms),
        format!(
            "  Replay guard     {}",
            if config.replay_protection { "on" } else { "off" }
        ),
        format!("  Signing key      {}", signing_key_line(&config.signing)),
        format!("  Review backend   {}", config.review.backend),
        format!(
            "  Gateway          {}:{}{}",
            config.gateway.host,
            config.gateway.port,
            if config.gateway.api_token.is_some() {
                " (bearer token required)"
            } else {
                ""
            }
        ),
        format!("  Log level        {}", config.observability.log_level),
        String::new(),
        format!("Policies ({})", config.policies.len()),
    ];

    for policy in &config.policies {
        let ttl = policy.token_ttl_secs.unwrap_or(config.token_ttl_secs);
        lines.push(format!(
            "  {}  {} rule(s), ttl {}s",
            policy.version,
            policy.rules.len(),
            ttl
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_prints_key_material() {
        let key = lockgate::security::SigningKey::generate();
        let dir = tempfile::TempDir::new().unwrap();
        let key_path = dir.path().join("signing.key");
        std::fs::write(&key_path, key.to_hex()).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        let mut config = Config::default();
        config.signing.key_env = "LOCKGATE_STATUS_TEST_UNSET_KEY".into();
        config.signing.key_file = Some(key_path.to_string_lossy().into_owned());

        let status = render_status(&config);
        assert!(!status.contains(&key.to_hex()));
        assert!(status.contains(&key.key_id()));
        assert!(status.contains("v1  4 rule(s), ttl 300s"));
    }

    #[test]
    fn status_does_not_generate_missing_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_path = dir.path().join("signing.key");

        let mut config = Config::default();
        config.signing.key_env = "LOCKGATE_STATUS_TEST_UNSET_KEY".into();
        config.signing.key_file = Some(key_path.to_string_lossy().into_owned());

        let status = render_status(&config);
        assert!(status.contains("not present"));
        assert!(!key_path.exists());
    }
}
