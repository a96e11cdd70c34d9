//! Host environment metadata consumed by the logging bootstrap.

/// Environment variable naming the current environment.
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

pub const DEVELOPMENT: &str = "Development";
pub const STAGING: &str = "Staging";
pub const PRODUCTION: &str = "Production";

/// Application and environment names of the running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub application_name: String,
    pub environment_name: String,
}

impl HostEnvironment {
    pub fn new(application_name: impl Into<String>, environment_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            environment_name: environment_name.into(),
        }
    }

    /// Read the environment name from `APP_ENVIRONMENT`, defaulting to
    /// `Production`. A `.env` file in the working directory is loaded first.
    pub fn from_env(application_name: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();

        let environment_name = std::env::var(ENVIRONMENT_VARIABLE)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| PRODUCTION.to_string());

        Self::new(application_name, environment_name)
    }

    /// Case-insensitive comparison with the environment name.
    pub fn is_environment(&self, name: &str) -> bool {
        self.environment_name.eq_ignore_ascii_case(name)
    }

    pub fn is_development(&self) -> bool {
        self.is_environment(DEVELOPMENT)
    }

    pub fn is_staging(&self) -> bool {
        self.is_environment(STAGING)
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(PRODUCTION)
    }
}
