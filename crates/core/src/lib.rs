pub mod aggregate;
pub mod charts;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod report;
pub mod session;
pub mod trend;

pub use error::DashboardError;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
    const DEFAULT_SMTP_PORT: u16 = 465;
    const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
    const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
    const DEFAULT_MAX_SESSIONS: usize = 1000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub smtp_host: String,
        pub smtp_port: u16,
        pub smtp_starttls: bool,
        pub report_sender: Option<String>,
        pub dispatch_timeout: Duration,
        pub max_upload_bytes: usize,
        /// Idle time after which an API session is dropped.
        pub session_ttl: Duration,
        pub max_sessions: usize,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                smtp_host: DEFAULT_SMTP_HOST.to_string(),
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_starttls: false,
                report_sender: None,
                dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
                max_sessions: DEFAULT_MAX_SESSIONS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from any key lookup; unset keys take their defaults,
        /// unparseable ones are errors.
        pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let defaults = Self::default();
            let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

            let smtp_port = parse_var(&var, "SMTP_PORT", "a port number")?
                .unwrap_or(defaults.smtp_port);

            let smtp_starttls = var("SMTP_STARTTLS")
                .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.smtp_starttls);

            let dispatch_timeout = match parse_var::<u64>(
                &var,
                "REPORT_DISPATCH_TIMEOUT_SECS",
                "a number of seconds",
            )? {
                Some(0) => anyhow::bail!("REPORT_DISPATCH_TIMEOUT_SECS must be greater than zero"),
                Some(secs) => Duration::from_secs(secs),
                None => defaults.dispatch_timeout,
            };

            let max_upload_bytes = parse_var(&var, "MAX_UPLOAD_BYTES", "a byte count")?
                .unwrap_or(defaults.max_upload_bytes);

            let session_ttl = match parse_var::<u64>(&var, "SESSION_TTL_SECS", "a number of seconds")? {
                Some(0) => anyhow::bail!("SESSION_TTL_SECS must be greater than zero"),
                Some(secs) => Duration::from_secs(secs),
                None => defaults.session_ttl,
            };

            let max_sessions = match parse_var::<usize>(&var, "MAX_SESSIONS", "a session count")? {
                Some(0) => anyhow::bail!("MAX_SESSIONS must be greater than zero"),
                Some(n) => n,
                None => defaults.max_sessions,
            };

            Ok(Self {
                smtp_host: var("SMTP_HOST").unwrap_or(defaults.smtp_host),
                smtp_port,
                smtp_starttls,
                report_sender: var("REPORT_SENDER"),
                dispatch_timeout,
                max_upload_bytes,
                session_ttl,
                max_sessions,
                sentry_dsn: var("SENTRY_DSN"),
            })
        }
    }

    fn parse_var<T>(
        var: &impl Fn(&str) -> Option<String>,
        key: &str,
        expected: &str,
    ) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        var(key)
            .map(|s| {
                s.trim()
                    .parse::<T>()
                    .with_context(|| format!("{key} must be {expected} (got {s:?})"))
            })
            .transpose()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let env: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| env.get(key).cloned())
        }

        #[test]
        fn unset_keys_take_defaults() {
            let s = settings(&[]).unwrap();
            assert_eq!(s.smtp_host, DEFAULT_SMTP_HOST);
            assert_eq!(s.smtp_port, DEFAULT_SMTP_PORT);
            assert_eq!(s.dispatch_timeout, Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS));
            assert_eq!(s.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
            assert_eq!(s.max_sessions, DEFAULT_MAX_SESSIONS);
            assert_eq!(s.report_sender, None);
        }

        #[test]
        fn reads_every_numeric_key() {
            let s = settings(&[
                ("SMTP_PORT", "587"),
                ("SMTP_STARTTLS", "true"),
                ("REPORT_DISPATCH_TIMEOUT_SECS", "5"),
                ("MAX_UPLOAD_BYTES", "2048"),
                ("SESSION_TTL_SECS", "60"),
                ("MAX_SESSIONS", "3"),
            ])
            .unwrap();
            assert_eq!(s.smtp_port, 587);
            assert!(s.smtp_starttls);
            assert_eq!(s.dispatch_timeout, Duration::from_secs(5));
            assert_eq!(s.max_upload_bytes, 2048);
            assert_eq!(s.session_ttl, Duration::from_secs(60));
            assert_eq!(s.max_sessions, 3);
        }

        #[test]
        fn typos_in_numeric_keys_are_errors() {
            for (key, value) in [
                ("SMTP_PORT", "465x"),
                ("REPORT_DISPATCH_TIMEOUT_SECS", "thirty"),
                ("MAX_UPLOAD_BYTES", "10MiB"),
                ("SESSION_TTL_SECS", "-1"),
                ("MAX_SESSIONS", "many"),
            ] {
                let err = settings(&[(key, value)]).unwrap_err();
                assert!(format!("{err:#}").contains(key), "{key}: {err:#}");
            }
        }

        #[test]
        fn zero_durations_and_session_cap_are_rejected() {
            assert!(settings(&[("REPORT_DISPATCH_TIMEOUT_SECS", "0")]).is_err());
            assert!(settings(&[("SESSION_TTL_SECS", "0")]).is_err());
            assert!(settings(&[("MAX_SESSIONS", "0")]).is_err());
        }
    }
}
