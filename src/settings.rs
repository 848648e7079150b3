//! Service configuration
//!
//! Settings load from `Settings.toml` with environment-variable overrides;
//! a `.env` file is read first and the logger is initialized as part of
//! loading.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShelfmarkSettings {
    pub application: ApplicationSettings,
    pub passkeys: PasskeySettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

/// Passkey relying-party settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasskeySettings {
    pub enabled: bool,
    pub rp_id: String,
    pub rp_name: String,
    pub rp_origin: String,
    pub timeout_seconds: u64,
    pub user_verification: String,
    pub authenticator_attachment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub session_duration_hours: u64,
    pub session_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for PasskeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rp_id: "localhost".to_string(),
            rp_name: "Shelfmark".to_string(),
            rp_origin: "http://localhost:8080".to_string(),
            timeout_seconds: 60,
            user_verification: "preferred".to_string(),
            authenticator_attachment: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_duration_hours: 24,
            session_secret: String::new(), // Will be generated if empty
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PasskeySettings {
    /// Ceremony timeout hint for clients, in milliseconds
    #[must_use]
    pub fn timeout_millis(&self) -> u32 {
        u32::try_from(self.timeout_seconds * 1000).unwrap_or(60_000)
    }
}

impl ShelfmarkSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment initialization fails
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Initialize environment and logging
        Self::initialize_environment()?;

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment variables and logging
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> Result<(), Box<dyn std::error::Error>> {
        Self::load_env_file();
        env_logger::try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `SHELFMARK_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("SHELFMARK_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)?;
                let secrets_settings: Self = basic_toml::from_str(&secrets_toml_content)?;

                println!("✓ Overriding settings from {}", secrets_path.display());

                settings = secrets_settings;
            } else {
                println!(
                    "ℹ SHELFMARK_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_passkey_env_overrides(&mut settings.passkeys);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for passkey settings
    pub fn apply_passkey_env_overrides(passkey_settings: &mut PasskeySettings) {
        if let Ok(enabled_str) = std::env::var("PASSKEY_ENABLED") {
            if let Ok(enabled) = enabled_str.parse::<bool>() {
                passkey_settings.enabled = enabled;
            }
        }
        if let Ok(rp_id) = std::env::var("PASSKEY_RP_ID") {
            passkey_settings.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("PASSKEY_RP_NAME") {
            passkey_settings.rp_name = rp_name;
        }
        if let Ok(rp_origin) = std::env::var("PASSKEY_RP_ORIGIN") {
            passkey_settings.rp_origin = rp_origin;
        }
        Self::apply_numeric_env_override(
            "PASSKEY_TIMEOUT_SECONDS",
            &mut passkey_settings.timeout_seconds,
        );
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_numeric_env_override(
            "SESSION_DURATION_HOURS",
            &mut session_settings.session_duration_hours,
        );

        // Handle session secret with special logic
        Self::handle_session_secret_override(session_settings);
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Helper function to handle session secret environment override and generation
    fn handle_session_secret_override(session_settings: &mut SessionSettings) {
        let env_secret_set = std::env::var("SESSION_SECRET").is_ok_and(|secret| {
            if secret.is_empty() {
                false
            } else {
                session_settings.session_secret = secret;
                true
            }
        });

        // Generate random session secret if no environment variable was set and current value is empty
        if !env_secret_set && session_settings.session_secret.is_empty() {
            session_settings.session_secret = Self::generate_random_session_secret();
            Self::warn_about_generated_secret();
        }
    }

    /// Generate a cryptographically secure random session secret
    ///
    /// Generates 32 bytes (256 bits) of entropy
    fn generate_random_session_secret() -> String {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        general_purpose::STANDARD.encode(secret)
    }

    /// Display warnings about using a generated session secret
    fn warn_about_generated_secret() {
        eprintln!("⚠️  WARNING: Using auto-generated session secret");
        eprintln!("🔒 For production use, set the SESSION_SECRET environment variable");
        eprintln!("   or configure session_secret in Settings.toml");
        eprintln!("💡 This secret will change on each restart unless explicitly configured");
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = ShelfmarkSettings::default();
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.passkeys.rp_id, "localhost");
        assert_eq!(settings.passkeys.rp_name, "Shelfmark");
        assert!(settings.passkeys.enabled);
        assert_eq!(settings.passkeys.timeout_millis(), 60_000);
    }

    #[test]
    #[serial]
    fn test_passkey_env_overrides() {
        std::env::set_var("PASSKEY_RP_ID", "shelfmark.app");
        std::env::set_var("PASSKEY_RP_ORIGIN", "https://shelfmark.app");
        std::env::set_var("PASSKEY_TIMEOUT_SECONDS", "120");

        let mut settings = ShelfmarkSettings::default();
        ShelfmarkSettings::apply_passkey_env_overrides(&mut settings.passkeys);

        assert_eq!(settings.passkeys.rp_id, "shelfmark.app");
        assert_eq!(settings.passkeys.rp_origin, "https://shelfmark.app");
        assert_eq!(settings.passkeys.timeout_seconds, 120);

        std::env::remove_var("PASSKEY_RP_ID");
        std::env::remove_var("PASSKEY_RP_ORIGIN");
        std::env::remove_var("PASSKEY_TIMEOUT_SECONDS");
    }

    #[test]
    #[serial]
    fn test_session_secret_generated_when_missing() {
        std::env::remove_var("SESSION_SECRET");
        let mut settings = ShelfmarkSettings::default();
        ShelfmarkSettings::apply_session_env_overrides(&mut settings.session);
        assert!(!settings.session.session_secret.is_empty());
    }

    #[test]
    fn test_cors_origins_parsing() {
        let settings = ShelfmarkSettings::default();
        let origins = settings.get_cors_origins();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
    }
}
