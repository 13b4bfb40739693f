use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;
use utils::env;

/// Files covered by the startup backup and the only targets self-edit accepts.
pub const PROTECTED_FILES: [&str; 3] = ["main.rs", "index.html", "Cargo.toml"];

/// Name of the static page served at `/`.
pub const INDEX_FILE: &str = "index.html";

pub const DEFAULT_BACKUP_DIR: &str = ".autobak_secret_do_not_move";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TTS_MODEL: &str = "playai-tts";
pub const DEFAULT_STT_MODEL: &str = "whisper-large-v3-turbo";
pub const DEFAULT_VOICE: &str = "Fritz-PlayAI";
pub const DEFAULT_OWNER_PASSWORD: &str = "252912";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to resolve working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

/// Process configuration, read once from the environment before the
/// listener binds and shared read-only afterwards.
#[derive(Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub llm_base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub stt_model: String,
    pub default_voice: String,
    pub owner_password: String,
    pub enable_shell: bool,
    pub unsafe_exec: bool,
    pub auto_restore: bool,
    pub app_root: PathBuf,
    pub backup_dir: PathBuf,
    /// Command run after a successful self-edit. `None` means no restart.
    pub restart_command: Option<String>,
    /// Lowercased hosts the fetcher refuses to contact.
    pub blocked_domains: Vec<String>,
    /// Hosts fetched without per-request approval. Empty means no approval
    /// step at all.
    pub allowed_domains: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_root = match env::var_opt("APP_ROOT") {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir()?,
        };
        let backup_dir = app_root.join(env::var_or("BACKUP_DIR", DEFAULT_BACKUP_DIR));

        Ok(Self {
            host: env::var_or("HOST", "0.0.0.0"),
            port: env::port("PORT", DEFAULT_PORT),
            api_key: env::var_opt("GROQ_API_KEY").unwrap_or_default(),
            llm_base_url: env::var_or("GROQ_BASE_URL", DEFAULT_BASE_URL),
            chat_model: env::var_or("MODEL", DEFAULT_CHAT_MODEL),
            tts_model: env::var_or("TTS_MODEL", DEFAULT_TTS_MODEL),
            stt_model: env::var_or("STT_MODEL", DEFAULT_STT_MODEL),
            default_voice: env::var_or("TTS_VOICE", DEFAULT_VOICE),
            owner_password: env::var_or("OWNER_PASSWORD", DEFAULT_OWNER_PASSWORD),
            enable_shell: env::flag("ENABLE_SHELL"),
            unsafe_exec: env::flag("UNSAFE_EXEC"),
            auto_restore: env::flag("AUTO_RESTORE"),
            app_root,
            backup_dir,
            restart_command: env::var_opt("SELF_EDIT_RESTART_CMD"),
            blocked_domains: env::list("FETCH_BLOCKED_DOMAINS"),
            allowed_domains: env::list("FETCH_ALLOWED_DOMAINS"),
        })
    }

    /// Defaults rooted at `app_root`, with no API key and every toggle off.
    pub fn with_root(app_root: impl Into<PathBuf>) -> Self {
        let app_root = app_root.into();
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            api_key: String::new(),
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            default_voice: DEFAULT_VOICE.to_string(),
            owner_password: DEFAULT_OWNER_PASSWORD.to_string(),
            enable_shell: false,
            unsafe_exec: false,
            auto_restore: false,
            backup_dir: app_root.join(DEFAULT_BACKUP_DIR),
            app_root,
            restart_command: None,
            blocked_domains: Vec::new(),
            allowed_domains: Vec::new(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn is_protected(filename: &str) -> bool {
        PROTECTED_FILES.contains(&filename)
    }

    pub fn live_path(&self, filename: &str) -> PathBuf {
        self.app_root.join(filename)
    }

    pub fn backup_path(&self, filename: &str) -> PathBuf {
        self.backup_dir.join(filename)
    }

    pub fn index_path(&self) -> PathBuf {
        self.live_path(INDEX_FILE)
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &redact(&self.api_key))
            .field("llm_base_url", &self.llm_base_url)
            .field("chat_model", &self.chat_model)
            .field("tts_model", &self.tts_model)
            .field("stt_model", &self.stt_model)
            .field("default_voice", &self.default_voice)
            .field("owner_password", &redact(&self.owner_password))
            .field("enable_shell", &self.enable_shell)
            .field("unsafe_exec", &self.unsafe_exec)
            .field("auto_restore", &self.auto_restore)
            .field("app_root", &self.app_root)
            .field("backup_dir", &self.backup_dir)
            .field("restart_command", &self.restart_command)
            .field("blocked_domains", &self.blocked_domains)
            .field("allowed_domains", &self.allowed_domains)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_three_protected_names_are_accepted() {
        assert!(GatewayConfig::is_protected("index.html"));
        assert!(GatewayConfig::is_protected("main.rs"));
        assert!(GatewayConfig::is_protected("Cargo.toml"));
        assert!(!GatewayConfig::is_protected("../index.html"));
        assert!(!GatewayConfig::is_protected("Index.html"));
        assert!(!GatewayConfig::is_protected(""));
    }

    #[test]
    fn paths_are_resolved_against_the_app_root() {
        let config = GatewayConfig::with_root("/srv/gateway");
        assert_eq!(config.index_path(), PathBuf::from("/srv/gateway/index.html"));
        assert_eq!(
            config.backup_path("main.rs"),
            PathBuf::from("/srv/gateway/.autobak_secret_do_not_move/main.rs")
        );
    }

    #[test]
    fn debug_output_never_leaks_secrets() {
        let mut config = GatewayConfig::with_root("/tmp");
        config.api_key = "gsk_live_secret".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gsk_live_secret"));
        assert!(!rendered.contains(DEFAULT_OWNER_PASSWORD));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut config = GatewayConfig::with_root("/tmp");
        assert!(!config.has_api_key());
        config.api_key = "   ".to_string();
        assert!(!config.has_api_key());
        config.api_key = "gsk".to_string();
        assert!(config.has_api_key());
    }
}
