use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_i64,
    parse_u16, parse_u64,
};
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, EdxSettings,
    IfmossoSettings, OpeneduSettings, RedisSettings, RuntimeSettings, ServerHost, ServerPort,
    ServerSettings, SessionSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PROCTOR_HOST", "0.0.0.0");
        let port = env_or_default("PROCTOR_PORT", "8000");

        let environment =
            parse_environment(env_optional("PROCTOR_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PROCTOR_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Proctor Portal API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "proctor");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "proctor_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let session_cookie_name = env_or_default("SESSION_COOKIE_NAME", "proctor_session");
        let session_ttl_minutes =
            parse_u64("SESSION_TTL_MINUTES", env_or_default("SESSION_TTL_MINUTES", "720"))?;

        let edx_request_exams_url = env_or_default("EDX_REQUEST_EXAMS_URL", "");
        let edx_start_exam_url = env_or_default("EDX_START_EXAM_URL", "");
        let edx_stop_exam_url = env_or_default("EDX_STOP_EXAM_URL", "");
        let edx_exam_status_url = env_or_default("EDX_EXAM_STATUS_URL", "");
        let edx_api_key = env_or_default("EDX_API_KEY", "");
        let edx_timeout_seconds =
            parse_u64("EDX_TIMEOUT_SECONDS", env_or_default("EDX_TIMEOUT_SECONDS", "30"))?;

        let openedu_authorization_url = env_or_default("OPENEDU_AUTHORIZATION_URL", "");
        let openedu_token_url = env_or_default("OPENEDU_TOKEN_URL", "");
        let openedu_user_profile_url = env_or_default("OPENEDU_USER_PROFILE_URL", "");
        let openedu_client_id = env_or_default("OPENEDU_CLIENT_ID", "");
        let openedu_client_secret = env_or_default("OPENEDU_CLIENT_SECRET", "");
        let openedu_callback_url = env_or_default("OPENEDU_CALLBACK_URL", "");

        let ifmosso_secret_key = env_or_default("IFMOSSO_SECRET_KEY", "");
        let ifmosso_max_skew_seconds = parse_i64(
            "IFMOSSO_MAX_SKEW_SECONDS",
            env_or_default("IFMOSSO_MAX_SKEW_SECONDS", "300"),
        )?;

        let first_admin_username = env_or_default("FIRST_ADMIN_USERNAME", "admin");
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");

        let log_level = env_or_default("PROCTOR_LOG_LEVEL", "info");
        let json = env_optional("PROCTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            session: SessionSettings {
                cookie_name: session_cookie_name,
                ttl_minutes: session_ttl_minutes,
            },
            edx: EdxSettings {
                request_exams_url: edx_request_exams_url,
                start_exam_url: edx_start_exam_url,
                stop_exam_url: edx_stop_exam_url,
                exam_status_url: edx_exam_status_url,
                api_key: edx_api_key,
                timeout_seconds: edx_timeout_seconds,
            },
            openedu: OpeneduSettings {
                authorization_url: openedu_authorization_url,
                token_url: openedu_token_url,
                user_profile_url: openedu_user_profile_url,
                client_id: openedu_client_id,
                client_secret: openedu_client_secret,
                callback_url: openedu_callback_url,
            },
            ifmosso: IfmossoSettings {
                secret_key: ifmosso_secret_key,
                max_skew_seconds: ifmosso_max_skew_seconds,
            },
            admin: AdminSettings { first_admin_username, first_admin_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn edx(&self) -> &EdxSettings {
        &self.edx
    }

    pub(crate) fn openedu(&self) -> &OpeneduSettings {
        &self.openedu
    }

    pub(crate) fn ifmosso(&self) -> &IfmossoSettings {
        &self.ifmosso
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_TTL_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.edx.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EDX_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.edx.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("EDX_API_KEY"));
        }
        if self.openedu.client_id.is_empty() || self.openedu.client_secret.is_empty() {
            return Err(ConfigError::MissingSecret("OPENEDU_CLIENT_ID/OPENEDU_CLIENT_SECRET"));
        }
        if self.ifmosso.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("IFMOSSO_SECRET_KEY"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}
