//! Stream policy and master key storage

use anyhow::{bail, Context, Result};
use base64::Engine;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::crypto::{AuthenticationAlgorithm, EncryptionAlgorithm};
use crate::srtp::{CryptoContext, CryptoContextCtrl, CryptoParams, SESSION_SALT_LEN};

/// Master salt length carried in `inline` keying material (112 bits).
pub const MASTER_SALT_LEN: usize = 14;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub keys: KeyConfig,
    pub stream: StreamConfig,
}

/// Algorithms and lengths, defaults to AES_CM_128_HMAC_SHA1_80
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// SDES suite name; when set it replaces the fields below
    pub suite: Option<String>,
    pub encryption: EncryptionAlgorithm,
    pub authentication: AuthenticationAlgorithm,
    pub cipher_key_len: usize,
    pub auth_key_len: usize,
    pub salt_len: usize,
    pub tag_len: usize,
    pub key_derivation_rate: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::from(CryptoParams::default())
    }
}

impl From<CryptoParams> for PolicyConfig {
    fn from(p: CryptoParams) -> Self {
        Self {
            suite: None,
            encryption: p.encryption,
            authentication: p.authentication,
            cipher_key_len: p.cipher_key_len,
            auth_key_len: p.auth_key_len,
            salt_len: p.salt_len,
            tag_len: p.tag_len,
            key_derivation_rate: p.key_derivation_rate,
        }
    }
}

/// Master key material, either as separate hex strings or as base64
/// `key || salt` (SDES `inline:` format)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub master_key: Option<String>,
    pub master_salt: Option<String>,
    pub inline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub ssrc: u32,
    pub roc: u32,
    /// Master key identifier, hex
    pub mki: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ssrc: 0xdeadbeef,
            roc: 0,
            mki: None,
        }
    }
}

/// Decoded master key and salt, wiped on drop
pub struct MasterKeyMaterial {
    pub key: Zeroizing<Vec<u8>>,
    pub salt: Zeroizing<Vec<u8>>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "srtp-context", "srtp-context")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk, returns the path written
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains master keys)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(path)
    }

    /// Resolve and validate the crypto policy
    pub fn crypto_params(&self) -> Result<CryptoParams> {
        let policy = &self.policy;
        let params = match &policy.suite {
            Some(name) => CryptoParams::from_suite_name(name)
                .with_context(|| format!("Unknown crypto suite: {}", name))?
                .with_key_derivation_rate(policy.key_derivation_rate),
            None => CryptoParams {
                encryption: policy.encryption,
                authentication: policy.authentication,
                cipher_key_len: policy.cipher_key_len,
                auth_key_len: policy.auth_key_len,
                salt_len: policy.salt_len,
                tag_len: policy.tag_len,
                key_derivation_rate: policy.key_derivation_rate,
            },
        };
        params.validate().context("Invalid crypto policy")?;
        Ok(params)
    }

    /// Decode the master key and salt
    pub fn master_key_material(&self) -> Result<MasterKeyMaterial> {
        if let Some(inline) = &self.keys.inline {
            let decoded = Zeroizing::new(
                base64::engine::general_purpose::STANDARD
                    .decode(inline.trim())
                    .context("Failed to base64 decode inline key")?,
            );
            let key_len = decoded.len().saturating_sub(MASTER_SALT_LEN);
            if key_len != 16 && key_len != 32 {
                bail!(
                    "Inline keying material has {} bytes (need 30 or 46)",
                    decoded.len()
                );
            }
            return Ok(MasterKeyMaterial {
                key: Zeroizing::new(decoded[..key_len].to_vec()),
                salt: Zeroizing::new(decoded[key_len..].to_vec()),
            });
        }

        let key_hex = self
            .keys
            .master_key
            .as_deref()
            .context("No master key configured (run `srtp-tool keygen`)")?;
        let key = Zeroizing::new(hex::decode(key_hex.trim()).context("Master key is not valid hex")?);
        let salt = match self.keys.master_salt.as_deref() {
            Some(s) => Zeroizing::new(hex::decode(s.trim()).context("Master salt is not valid hex")?),
            None => Zeroizing::new(Vec::new()),
        };
        if salt.len() > SESSION_SALT_LEN {
            bail!("Master salt has {} bytes (at most {})", salt.len(), SESSION_SALT_LEN);
        }
        Ok(MasterKeyMaterial { key, salt })
    }

    /// Store generated key material as hex
    pub fn set_master_key_material(&mut self, key: &[u8], salt: &[u8]) {
        self.keys.master_key = Some(hex::encode(key));
        self.keys.master_salt = Some(hex::encode(salt));
        self.keys.inline = None;
    }

    pub fn mki(&self) -> Result<Vec<u8>> {
        match self.stream.mki.as_deref() {
            Some(s) => hex::decode(s.trim()).context("MKI is not valid hex"),
            None => Ok(Vec::new()),
        }
    }

    /// Build an SRTP context for `ssrc` from this configuration
    pub fn rtp_context(&self, ssrc: u32) -> Result<CryptoContext> {
        let params = self.crypto_params()?;
        let keys = self.master_key_material()?;
        let mut ctx = CryptoContext::try_new(ssrc, self.stream.roc, params, &keys.key, &keys.salt)
            .context("Failed to create SRTP context")?;
        ctx.set_mki(&self.mki()?);
        Ok(ctx)
    }

    /// Build an SRTCP context for `ssrc` from this configuration
    pub fn rtcp_context(&self, ssrc: u32) -> Result<CryptoContextCtrl> {
        let params = self.crypto_params()?;
        let keys = self.master_key_material()?;
        let mut ctx = CryptoContextCtrl::try_new(ssrc, params, &keys.key, &keys.salt)
            .context("Failed to create SRTCP context")?;
        ctx.set_mki(&self.mki()?);
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> Config {
        let mut config = Config::default();
        config.set_master_key_material(&[0x01; 16], &[0x02; 14]);
        config
    }

    #[test]
    fn test_default_policy() {
        let config = Config::default();
        assert_eq!(
            config.crypto_params().unwrap(),
            CryptoParams::aes_cm_128_hmac_sha1_80()
        );
        assert_eq!(config.stream.ssrc, 0xdeadbeef);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = keyed();
        config.stream.mki = Some("0a0b".to_string());
        config.policy.key_derivation_rate = 1 << 16;
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::from_toml(
            r#"
            [policy]
            suite = "AES_CM_128_HMAC_SHA1_32"

            [keys]
            master_key = "000102030405060708090a0b0c0d0e0f"

            [stream]
            ssrc = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.crypto_params().unwrap().tag_len, 4);
        assert_eq!(config.stream.ssrc, 42);
        let keys = config.master_key_material().unwrap();
        assert_eq!(keys.key.len(), 16);
        assert!(keys.salt.is_empty());
    }

    #[test]
    fn test_explicit_algorithms() {
        let config = Config::from_toml(
            r#"
            [policy]
            encryption = "aes-f8"
            authentication = "hmac-sha1"
            cipher_key_len = 16
            auth_key_len = 20
            salt_len = 14
            tag_len = 10
            "#,
        )
        .unwrap();
        assert_eq!(
            config.crypto_params().unwrap(),
            CryptoParams::aes_f8_128_hmac_sha1_80()
        );
    }

    #[test]
    fn test_invalid_policy_is_error() {
        let mut config = Config::default();
        config.policy.cipher_key_len = 24;
        assert!(config.crypto_params().is_err());

        config.policy.suite = Some("NOT_A_SUITE".to_string());
        assert!(config.crypto_params().is_err());
    }

    #[test]
    fn test_inline_key_material() {
        let mut material = vec![0xAB; 16];
        material.extend_from_slice(&[0xCD; 14]);
        let mut config = Config::default();
        config.keys.inline = Some(base64::engine::general_purpose::STANDARD.encode(&material));

        let keys = config.master_key_material().unwrap();
        assert_eq!(&keys.key[..], &[0xAB; 16]);
        assert_eq!(&keys.salt[..], &[0xCD; 14]);

        config.keys.inline = Some(base64::engine::general_purpose::STANDARD.encode([0u8; 20]));
        assert!(config.master_key_material().is_err());
    }

    #[test]
    fn test_missing_or_bad_keys() {
        let mut config = Config::default();
        assert!(config.master_key_material().is_err());
        config.keys.master_key = Some("zz".to_string());
        assert!(config.master_key_material().is_err());
    }

    #[test]
    fn test_contexts_from_config() {
        let mut config = keyed();
        config.stream.mki = Some("ff".to_string());
        config.stream.roc = 5;
        let rtp = config.rtp_context(7).unwrap();
        assert_eq!(rtp.ssrc(), 7);
        assert_eq!(rtp.roc(), 5);
        assert_eq!(rtp.mki(), Some(&[0xFFu8][..]));
        let rtcp = config.rtcp_context(7).unwrap();
        assert_eq!(rtcp.mki_len(), 1);

        config.keys.master_key = Some(hex::encode([0u8; 20]));
        assert!(config.rtp_context(7).is_err());
    }
}
