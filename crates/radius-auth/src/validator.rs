//! The `validate` entry point

use crate::audit::{AuditLog, AuthLog, TRANSPORT_ERROR_TAGS, TracingLog};
use crate::client::{RadiusExchange, UdpExchange};
use crate::config::{AuthConfig, ClientOptionsConfig};
use crate::error::{AuthError, ConfigError};
use crate::request::AccessRequest;
use crate::response::is_authenticated;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Identity of the user that was checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
}

/// Successful outcome of [`RadiusValidator::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// True for Access-Accept, false for Access-Reject
    pub is_valid: bool,
    pub credentials: Credentials,
}

/// Checks username/password pairs against the configured RADIUS servers
///
/// Cheap to share behind an `Arc`; any number of `validate` calls may run
/// concurrently. Each call works on the configuration as it was when the
/// call started.
pub struct RadiusValidator {
    config: RwLock<Arc<AuthConfig>>,
    exchange: Arc<dyn RadiusExchange>,
    logger: Arc<dyn AuthLog>,
    rng: Mutex<StdRng>,
    default_identifier: u8,
}

impl RadiusValidator {
    /// Validate `config` and set up a validator with the UDP exchange
    ///
    /// Opens the audit log when `audit_log_path` is configured.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let logger: Arc<dyn AuthLog> = match config.audit_log_path {
            Some(ref path) => Arc::new(AuditLog::open(path)?),
            None => Arc::new(TracingLog),
        };

        let mut rng = StdRng::from_os_rng();
        let default_identifier = rng.random();

        Ok(RadiusValidator {
            config: RwLock::new(Arc::new(config)),
            exchange: Arc::new(UdpExchange::new()),
            logger,
            rng: Mutex::new(rng),
            default_identifier,
        })
    }

    /// Replace the exchange client
    pub fn with_exchange(mut self, exchange: Arc<dyn RadiusExchange>) -> Self {
        self.exchange = exchange;
        self
    }

    /// Replace the diagnostic log sink
    pub fn with_logger(mut self, logger: Arc<dyn AuthLog>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the random source used for host selection
    ///
    /// The default identifier is redrawn from the new source.
    pub fn with_rng(mut self, mut rng: StdRng) -> Self {
        self.default_identifier = rng.random();
        self.rng = Mutex::new(rng);
        self
    }

    /// Check one username/password pair
    ///
    /// Access-Reject is `Ok` with `is_valid == false`. Transport failures are
    /// reported to the log sink once and returned as
    /// [`AuthError::Transport`]. Credentials too long to encode fail with
    /// [`AuthError::Request`] before anything is sent.
    pub async fn validate(
        &self,
        user_name: &str,
        user_password: &str,
    ) -> Result<Validation, AuthError> {
        let config = self.config();

        let identifier = config.identifier.unwrap_or(self.default_identifier);
        let request = AccessRequest::build(user_name, user_password, &config, identifier)?;

        let options = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            config.options.resolve(&mut *rng)?
        };

        debug!(
            user = user_name,
            host = %options.target(),
            identifier = identifier,
            "Authenticating"
        );

        match self.exchange.exchange(&request, &options).await {
            Ok(response) => Ok(Validation {
                is_valid: is_authenticated(&response),
                credentials: Credentials {
                    id: user_name.to_string(),
                },
            }),
            Err(e) => {
                self.logger.log(&TRANSPORT_ERROR_TAGS, &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Arc<AuthConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current connection options (host list, port, timeout, retries)
    pub fn client_options(&self) -> ClientOptionsConfig {
        self.config().options.clone()
    }

    /// Change connection options for subsequent calls
    ///
    /// Calls already running keep the options they started with.
    pub fn set_client_options(&self, options: ClientOptionsConfig) -> Result<(), ConfigError> {
        options.validate()?;

        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = AuthConfig::clone(&current);
        next.options = options;
        *current = Arc::new(next);
        Ok(())
    }

    /// Swap the whole configuration for subsequent calls
    ///
    /// The log sink chosen at construction is kept.
    pub fn replace_config(&self, config: AuthConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        Ok(())
    }

    /// Identifier used when the configuration does not fix one
    pub fn default_identifier(&self) -> u8 {
        self.default_identifier
    }
}

impl std::fmt::Debug for RadiusValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config();
        f.debug_struct("RadiusValidator")
            .field("ip_address", &config.ip_address)
            .field("options", &config.options)
            .field("default_identifier", &self.default_identifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::error::{RequestError, TransportError};
    use crate::host::HostConfig;
    use crate::response::AuthResponse;
    use async_trait::async_trait;
    use radius_proto::Code;
    use std::sync::Mutex as StdMutex;

    /// Answers every request with a fixed outcome and remembers what it saw
    struct ScriptedExchange {
        outcome: Option<Code>,
        seen: StdMutex<Vec<(AccessRequest, ClientOptions)>>,
    }

    impl ScriptedExchange {
        fn answering(code: Code) -> Arc<Self> {
            Arc::new(ScriptedExchange {
                outcome: Some(code),
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn silent() -> Arc<Self> {
            Arc::new(ScriptedExchange {
                outcome: None,
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(AccessRequest, ClientOptions)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RadiusExchange for ScriptedExchange {
        async fn exchange(
            &self,
            request: &AccessRequest,
            options: &ClientOptions,
        ) -> Result<AuthResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.clone(), options.clone()));

            match self.outcome {
                Some(code) => Ok(AuthResponse {
                    code,
                    identifier: request.identifier(),
                    attributes: vec![],
                }),
                None => Err(TransportError::Timeout {
                    host: options.target(),
                    attempts: options.attempts(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        lines: StdMutex<Vec<(Vec<String>, String)>>,
    }

    impl AuthLog for RecordingLog {
        fn log(&self, tags: &[&str], message: &str) {
            self.lines.lock().unwrap().push((
                tags.iter().map(|t| t.to_string()).collect(),
                message.to_string(),
            ));
        }
    }

    fn test_config() -> AuthConfig {
        let mut config = AuthConfig::new("127.0.0.1".parse().unwrap(), "s3cret", vec!["127.0.0.1"]);
        config.options.timeout = 200;
        config.options.retries = 1;
        config
    }

    fn validator(exchange: Arc<dyn RadiusExchange>, log: Arc<RecordingLog>) -> RadiusValidator {
        RadiusValidator::new(test_config())
            .unwrap()
            .with_exchange(exchange)
            .with_logger(log)
            .with_rng(StdRng::seed_from_u64(11))
    }

    #[tokio::test]
    async fn test_accept() {
        let log = Arc::new(RecordingLog::default());
        let validator = validator(ScriptedExchange::answering(Code::AccessAccept), log.clone());

        let validation = validator.validate("alice", "pw1").await.unwrap();
        assert!(validation.is_valid);
        assert_eq!(validation.credentials.id, "alice");
        assert!(log.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_is_not_an_error() {
        let log = Arc::new(RecordingLog::default());
        let validator = validator(ScriptedExchange::answering(Code::AccessReject), log.clone());

        let validation = validator.validate("alice", "pw1").await.unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.credentials.id, "alice");
        assert!(log.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_logged_once() {
        let log = Arc::new(RecordingLog::default());
        let validator = validator(ScriptedExchange::silent(), log.clone());

        let err = validator.validate("alice", "pw1").await.unwrap_err();
        assert!(err.as_transport().unwrap().is_timeout());

        let lines = log.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, vec!["error", "auth-radius"]);
        assert_eq!(lines[0].1, err.to_string());
    }

    #[tokio::test]
    async fn test_oversized_credentials_rejected_before_exchange() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let log = Arc::new(RecordingLog::default());
        let validator = validator(exchange.clone(), log.clone());

        let err = validator.validate(&"u".repeat(300), "b").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Request(RequestError::UserNameTooLong(300))
        ));

        let err = validator.validate("alice", &"p".repeat(129)).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Request(RequestError::PasswordTooLong(129))
        ));

        assert!(exchange.seen().is_empty());
        assert!(log.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_and_options_passed_to_exchange() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let validator = validator(exchange.clone(), Arc::new(RecordingLog::default()));

        validator.validate("alice", "pw1").await.unwrap();

        let seen = exchange.seen();
        assert_eq!(seen.len(), 1);
        let (request, options) = &seen[0];
        assert_eq!(request.user_name(), Some("alice"));
        assert_eq!(request.secret(), b"s3cret");
        assert_eq!(request.identifier(), validator.default_identifier());
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 1812);
        assert_eq!(options.timeout.as_millis(), 200);
        assert_eq!(options.retries, 1);
    }

    #[tokio::test]
    async fn test_configured_identifier_wins() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let mut config = test_config();
        config.identifier = Some(77);
        let validator = RadiusValidator::new(config)
            .unwrap()
            .with_exchange(exchange.clone());

        validator.validate("alice", "pw1").await.unwrap();
        validator.validate("bob", "pw2").await.unwrap();

        assert!(exchange.seen().iter().all(|(r, _)| r.identifier() == 77));
    }

    #[tokio::test]
    async fn test_default_identifier_fixed_across_calls() {
        let exchange = ScriptedExchange::answering(Code::AccessReject);
        let validator = validator(exchange.clone(), Arc::new(RecordingLog::default()));

        for _ in 0..5 {
            validator.validate("alice", "pw1").await.unwrap();
        }

        let ids: Vec<u8> = exchange.seen().iter().map(|(r, _)| r.identifier()).collect();
        assert!(ids.iter().all(|id| *id == validator.default_identifier()));
    }

    #[tokio::test]
    async fn test_seeded_rng_is_deterministic() {
        let a = RadiusValidator::new(test_config())
            .unwrap()
            .with_rng(StdRng::seed_from_u64(99));
        let b = RadiusValidator::new(test_config())
            .unwrap()
            .with_rng(StdRng::seed_from_u64(99));
        assert_eq!(a.default_identifier(), b.default_identifier());
    }

    #[tokio::test]
    async fn test_host_reselected_every_call() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let validator = validator(exchange.clone(), Arc::new(RecordingLog::default()));
        validator
            .set_client_options(ClientOptionsConfig::new(vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]))
            .unwrap();

        for _ in 0..200 {
            validator.validate("alice", "pw1").await.unwrap();
        }

        let mut hosts: Vec<String> = exchange.seen().into_iter().map(|(_, o)| o.host).collect();
        hosts.sort();
        hosts.dedup();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_runtime_option_changes() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let validator = validator(exchange.clone(), Arc::new(RecordingLog::default()));

        let mut options = validator.client_options();
        assert_eq!(options.retries, 1);
        options.timeout = 50;
        options.retries = 0;
        validator.set_client_options(options).unwrap();

        validator.validate("alice", "pw1").await.unwrap();
        let (_, seen) = &exchange.seen()[0];
        assert_eq!(seen.timeout.as_millis(), 50);
        assert_eq!(seen.retries, 0);

        // Invalid options are refused and the old ones kept
        let result = validator.set_client_options(ClientOptionsConfig::new(HostConfig::Pool(vec![])));
        assert!(matches!(result, Err(ConfigError::EmptyHostList)));
        assert_eq!(validator.client_options().timeout, 50);
    }

    #[tokio::test]
    async fn test_replace_config() {
        let exchange = ScriptedExchange::answering(Code::AccessAccept);
        let validator = validator(exchange.clone(), Arc::new(RecordingLog::default()));

        let before = validator.config();
        let mut next = test_config();
        next.secret = "rotated".to_string();
        validator.replace_config(next).unwrap();

        // Earlier snapshots are unaffected
        assert_eq!(before.secret, "s3cret");

        validator.validate("alice", "pw1").await.unwrap();
        assert_eq!(exchange.seen()[0].0.secret(), b"rotated");

        let mut bad = test_config();
        bad.secret = String::new();
        assert!(validator.replace_config(bad).is_err());
        assert_eq!(validator.config().secret, "rotated");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = test_config();
        config.options.host = HostConfig::Pool(vec![]);
        assert!(matches!(
            RadiusValidator::new(config),
            Err(ConfigError::EmptyHostList)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let validator = RadiusValidator::new(test_config()).unwrap();
        let debug = format!("{:?}", validator);
        assert!(debug.contains("127.0.0.1"));
        assert!(!debug.contains("s3cret"));
    }
}
