use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub export_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://gradkart.db?mode=rwc".to_string());
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@gradkart.app".to_string());
        let admin_password =
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "gradkart2024".to_string());
        let export_dir = env::var("EXPORT_DIR").unwrap_or_else(|_| "exports".to_string());
        Ok(Self {
            database_url,
            admin_email,
            admin_password,
            export_dir,
        })
    }
}
