use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "crate::config::defaults::default_jwt_kid")]
    pub jwt_kid: String,
    #[serde(default)]
    pub previous_jwt_secrets: Vec<String>,
    #[serde(default)]
    pub previous_jwt_kids: Vec<String>,
    #[serde(default = "crate::config::defaults::default_jwt_expiration_seconds")]
    pub jwt_expiration_seconds: u64,
    pub issuer: String,
    pub audience: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_kid", &self.jwt_kid)
            .field("previous_jwt_secrets", &"[REDACTED]")
            .field("previous_jwt_kids", &self.previous_jwt_kids)
            .field("jwt_expiration_seconds", &self.jwt_expiration_seconds)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}
