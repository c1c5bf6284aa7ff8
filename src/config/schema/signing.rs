use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Environment variable holding a hex key; wins over `key_file`
    #[serde(default = "default_key_env")]
    pub key_env: String,
    /// Hex key file; `~` is expanded
    #[serde(default = "default_key_file")]
    pub key_file: Option<String>,
    /// Create `key_file` with a fresh random key when it does not exist
    #[serde(default = "default_true")]
    pub generate_if_missing: bool,
}

fn default_key_env() -> String {
    "LOCKGATE_SIGNING_KEY".into()
}

#[allow(clippy::unnecessary_wraps)]
fn default_key_file() -> Option<String> {
    Some("~/.lockgate/signing.key".into())
}

fn default_true() -> bool {
    true
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            key_file: default_key_file(),
            generate_if_missing: true,
        }
    }
}
