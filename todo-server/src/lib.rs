pub mod config {
    use anyhow::anyhow;
    use chrono::FixedOffset;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Offset of the local calendar, in minutes east of UTC.
        #[serde(default)]
        pub utc_offset_minutes: i32,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_source(config::Environment::default().try_parsing(true))
        }

        pub fn from_source<S>(source: S) -> anyhow::Result<Self>
        where
            S: config::Source + Send + Sync + 'static,
        {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Returns the configured calendar offset.
        pub fn utc_offset(&self) -> anyhow::Result<FixedOffset> {
            self.utc_offset_minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or_else(|| {
                    anyhow!(
                        "UTC offset of {} minutes is out of range",
                        self.utc_offset_minutes
                    )
                })
        }
    }

    fn default_port() -> u16 {
        8080
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn environment(vars: &[(&str, &str)]) -> config::Environment {
            let vars = vars
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            config::Environment::default()
                .try_parsing(true)
                .source(Some(vars))
        }

        #[test]
        fn can_load_config_with_defaults() {
            let config =
                Config::from_source(environment(&[("DB_URL", "sqlite::memory:")])).unwrap();

            assert_eq!(config.db_url, "sqlite::memory:");
            assert_eq!(config.port, 8080);
            assert_eq!(config.utc_offset_minutes, 0);
            assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 0);
        }

        #[test]
        fn can_load_port_and_offset() {
            let config = Config::from_source(environment(&[
                ("DB_URL", "postgres://localhost/todo"),
                ("PORT", "3000"),
                ("UTC_OFFSET_MINUTES", "-300"),
            ]))
            .unwrap();

            assert_eq!(config.port, 3000);
            assert_eq!(config.utc_offset().unwrap().local_minus_utc(), -300 * 60);
        }

        #[test]
        fn fails_without_db_url() {
            assert!(Config::from_source(environment(&[("PORT", "3000")])).is_err());
        }

        #[test]
        fn rejects_offset_beyond_a_day() {
            let config = Config::from_source(environment(&[
                ("DB_URL", "sqlite::memory:"),
                ("UTC_OFFSET_MINUTES", "1500"),
            ]))
            .unwrap();

            assert!(config.utc_offset().is_err());
        }
    }
}
pub mod entities;
pub mod task;
pub mod web;
