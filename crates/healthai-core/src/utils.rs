//! 通用工具函数

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{HealthError, Result};

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

/// 密码哈希器，格式：`pbkdf2-sha256$<iterations>$<salt>$<hash>`
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_PBKDF2_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive(password, &salt, self.iterations);

        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        )
    }

    /// 校验密码。迭代次数取自存储的哈希，与当前配置无关
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let parts: Vec<&str> = stored.split('$').collect();
        if parts.len() != 4 || parts[0] != SCHEME {
            return Err(HealthError::Internal("Unrecognized password hash format".to_string()));
        }

        let iterations: u32 = parts[1]
            .parse()
            .map_err(|_| HealthError::Internal("Invalid hash iteration count".to_string()))?;
        let salt = STANDARD_NO_PAD
            .decode(parts[2])
            .map_err(|_| HealthError::Internal("Invalid hash salt".to_string()))?;
        let expected = STANDARD_NO_PAD
            .decode(parts[3])
            .map_err(|_| HealthError::Internal("Invalid hash digest".to_string()))?;

        let actual = derive(password, &salt, iterations);
        Ok(actual.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 1)
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// 邮箱统一为去空白小写形式
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
