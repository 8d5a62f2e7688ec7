use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    /// Base URL of the SPA, used to build verification/reset links.
    pub frontend_base_url: String,
    /// Validity window for emailed verification/reset tokens.
    pub lifecycle_token_ttl_minutes: i64,
}

impl AppConfig {
    /// Reads configuration from the environment. Missing secrets
    /// (DATABASE_URL, JWT_SECRET, SMTP credentials) abort startup.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "inkwell".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "inkwell-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let username = std::env::var("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST")?,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            password: std::env::var("SMTP_PASSWORD")?,
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| username.clone()),
            username,
        };
        let frontend_base_url =
            std::env::var("FRONTEND_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let lifecycle_token_ttl_minutes = std::env::var("LIFECYCLE_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);
        Ok(Self {
            database_url,
            jwt,
            smtp,
            frontend_base_url,
            lifecycle_token_ttl_minutes,
        })
    }
}
