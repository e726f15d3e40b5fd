//! Shared handler state

use std::sync::Arc;

use super::auth::{AllowAll, Authorizer, BearerTokenAuthorizer};
use crate::config::{Config, RuntimeMode};
use crate::domain::call_events::CallEventSink;
use crate::domain::call_history::CallHistoryProvider;
use crate::domain::credential::CredentialIssuer;
use crate::domain::directory::{ClientDirectory, StaticDirectory};
use crate::domain::shared::Result;
use crate::infrastructure::events::TracingEventSink;
use crate::infrastructure::twilio::{AccessTokenIssuer, RequestValidator, TwilioRestClient};

/// Application state
///
/// Every collaborator is injected as a trait object so handlers can be
/// exercised against test doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credential_issuer: Arc<dyn CredentialIssuer>,
    pub call_history: Arc<dyn CallHistoryProvider>,
    pub event_sink: Arc<dyn CallEventSink>,
    pub directory: Arc<dyn ClientDirectory>,
    pub authorizer: Arc<dyn Authorizer>,
    pub webhook_validator: Option<Arc<RequestValidator>>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    ///
    /// Authorization and webhook signature checks follow the configuration.
    pub fn new(
        config: Config,
        credential_issuer: Arc<dyn CredentialIssuer>,
        call_history: Arc<dyn CallHistoryProvider>,
        event_sink: Arc<dyn CallEventSink>,
        directory: Arc<dyn ClientDirectory>,
    ) -> Self {
        let authorizer: Arc<dyn Authorizer> = match &config.gateway.api_auth_token {
            Some(token) => Arc::new(BearerTokenAuthorizer::new(token.clone())),
            None => Arc::new(AllowAll),
        };

        let webhook_validator = config
            .gateway
            .webhook_base_url
            .as_ref()
            .map(|_| Arc::new(RequestValidator::new(config.twilio.auth_token.clone())));

        Self {
            config: Arc::new(config),
            credential_issuer,
            call_history,
            event_sink,
            directory,
            authorizer,
            webhook_validator,
        }
    }

    /// Wire the provider-backed collaborators from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let issuer = AccessTokenIssuer::new(&config.twilio, config.gateway.token_ttl_secs);
        let client = TwilioRestClient::new(&config.twilio)?;
        let directory = StaticDirectory::new(config.gateway.incoming_client_identity.clone());

        Ok(Self::new(
            config,
            Arc::new(issuer),
            Arc::new(client),
            Arc::new(TracingEventSink::new()),
            Arc::new(directory),
        ))
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn mode(&self) -> RuntimeMode {
        self.config.server.mode
    }
}
