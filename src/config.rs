use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub base_url: String,
    pub poll_secs: u64,
    pub request_timeout_secs: u64,
    /// Voltage above which the derived snapshot reports an auto-shutdown.
    pub voltage_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    pub python_bin: String,
    pub script_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub client_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub device: DeviceConfig,
    pub predict: PredictConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "homewatt".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "homewatt-users".into()),
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from_email: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@homewatt.local".into()),
            from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "HomeWatt".into()),
        };
        let device = DeviceConfig {
            base_url: std::env::var("DEVICE_BASE_URL")
                .unwrap_or_else(|_| "http://192.168.4.1".into()),
            poll_secs: std::env::var("DEVICE_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            request_timeout_secs: std::env::var("DEVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            voltage_threshold: std::env::var("DEVICE_VOLTAGE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0),
        };
        let predict = PredictConfig {
            python_bin: std::env::var("PREDICT_PYTHON_BIN").unwrap_or_else(|_| "python3".into()),
            script_path: std::env::var("PREDICT_SCRIPT_PATH")
                .unwrap_or_else(|_| "scripts/predict.py".into()),
        };
        Ok(Self {
            database_url,
            client_url,
            jwt,
            smtp,
            device,
            predict,
        })
    }
}
