//! Credential sources for the S3 client
//!
//! The usual source is a Cognito identity pool: the provider asks the pool for
//! an identity id, then exchanges it for temporary credentials. Nothing is
//! checked up front, so a misconfigured pool shows up as an error on the first
//! signed request (the upload itself).
//!
//! Without a pool the client falls back to a named AWS profile or the default
//! credential chain (environment, ~/.aws files, instance roles).

use aws_config::BehaviorVersion;
use aws_credential_types::provider::{self, error::CredentialsError, future, ProvideCredentials};
use aws_credential_types::Credentials;
use aws_sdk_cognitoidentity::config::Region;
use aws_sdk_cognitoidentity::error::DisplayErrorContext;
use aws_sdk_cognitoidentity::Client as CognitoClient;
use std::time::{Duration, UNIX_EPOCH};

use crate::config::UploaderConfig;

const PROVIDER_NAME: &str = "CognitoIdentity";

/// Which credential mechanism a config selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Temporary credentials from a Cognito identity pool
    IdentityPool(String),
    /// Named profile from ~/.aws/config
    Profile(String),
    /// Whatever the SDK's default chain finds
    DefaultChain,
}

impl CredentialSource {
    pub fn from_config(config: &UploaderConfig) -> Self {
        if config.has_identity_pool() {
            CredentialSource::IdentityPool(config.identity_pool_id.trim().to_string())
        } else if let Some(profile) = config.profile.as_deref().filter(|p| !p.is_empty()) {
            CredentialSource::Profile(profile.to_string())
        } else {
            CredentialSource::DefaultChain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::IdentityPool(_) => "Cognito Identity Pool",
            CredentialSource::Profile(_) => "AWS Profile",
            CredentialSource::DefaultChain => "Default Chain",
        }
    }
}

/// Region encoded in an identity pool id (`us-east-1:0000-...`)
fn pool_region(identity_pool_id: &str) -> Option<&str> {
    identity_pool_id
        .split_once(':')
        .map(|(region, _)| region)
        .filter(|region| !region.is_empty())
}

/// Exchanges a Cognito identity pool for temporary AWS credentials
#[derive(Debug, Clone)]
pub struct CognitoCredentialsProvider {
    client: CognitoClient,
    identity_pool_id: String,
}

impl CognitoCredentialsProvider {
    /// Build a provider talking to Cognito in the pool's own region, falling
    /// back to `region` when the id carries none.
    pub async fn new(region: &str, identity_pool_id: &str) -> Self {
        let cognito_region = pool_region(identity_pool_id).unwrap_or(region).to_string();

        // GetId and GetCredentialsForIdentity are unsigned calls
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cognito_region))
            .no_credentials()
            .load()
            .await;

        Self::with_client(CognitoClient::new(&config), identity_pool_id)
    }

    fn with_client(client: CognitoClient, identity_pool_id: &str) -> Self {
        Self {
            client,
            identity_pool_id: identity_pool_id.to_string(),
        }
    }

    async fn fetch(&self) -> provider::Result {
        let identity = self
            .client
            .get_id()
            .identity_pool_id(&self.identity_pool_id)
            .send()
            .await
            .map_err(|e| CredentialsError::provider_error(DisplayErrorContext(e).to_string()))?;

        let identity_id = identity
            .identity_id()
            .ok_or_else(|| CredentialsError::not_loaded("identity pool returned no identity id"))?;

        tracing::debug!("Resolved Cognito identity {}", identity_id);

        let output = self
            .client
            .get_credentials_for_identity()
            .identity_id(identity_id)
            .send()
            .await
            .map_err(|e| CredentialsError::provider_error(DisplayErrorContext(e).to_string()))?;

        let creds = output
            .credentials()
            .ok_or_else(|| CredentialsError::not_loaded("identity has no credentials"))?;

        let access_key_id = creds
            .access_key_id()
            .ok_or_else(|| CredentialsError::invalid_configuration("missing access key id"))?;
        let secret_key = creds
            .secret_key()
            .ok_or_else(|| CredentialsError::invalid_configuration("missing secret key"))?;

        let expiry = creds
            .expiration()
            .and_then(|t| u64::try_from(t.secs()).ok())
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));

        Ok(Credentials::new(
            access_key_id,
            secret_key,
            creds.session_token().map(str::to_string),
            expiry,
            PROVIDER_NAME,
        ))
    }
}

impl ProvideCredentials for CognitoCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_region() {
        assert_eq!(
            pool_region("us-east-1:11111111-2222-3333-4444-555555555555"),
            Some("us-east-1")
        );
        assert_eq!(pool_region("eu-central-1:abc"), Some("eu-central-1"));
        assert_eq!(pool_region("no-region-here"), None);
        assert_eq!(pool_region(":abc"), None);
    }

    #[test]
    fn test_source_prefers_identity_pool() {
        let config = UploaderConfig {
            identity_pool_id: " us-east-1:pool ".to_string(),
            profile: Some("dev".to_string()),
            ..UploaderConfig::default()
        };
        assert_eq!(
            CredentialSource::from_config(&config),
            CredentialSource::IdentityPool("us-east-1:pool".to_string())
        );
    }

    #[test]
    fn test_source_profile_without_pool() {
        let config = UploaderConfig {
            profile: Some("dev".to_string()),
            ..UploaderConfig::default()
        };
        assert_eq!(
            CredentialSource::from_config(&config),
            CredentialSource::Profile("dev".to_string())
        );
    }

    #[test]
    fn test_source_default_chain() {
        let config = UploaderConfig {
            profile: Some(String::new()),
            ..UploaderConfig::default()
        };
        assert_eq!(CredentialSource::from_config(&config), CredentialSource::DefaultChain);
    }

    #[test]
    fn test_source_as_str() {
        assert_eq!(
            CredentialSource::IdentityPool("x".into()).as_str(),
            "Cognito Identity Pool"
        );
        assert_eq!(CredentialSource::Profile("x".into()).as_str(), "AWS Profile");
        assert_eq!(CredentialSource::DefaultChain.as_str(), "Default Chain");
    }

    #[tokio::test]
    async fn test_provider_talks_to_pool_region() {
        let provider = CognitoCredentialsProvider::new("us-east-1", "eu-west-1:pool").await;
        assert_eq!(provider.identity_pool_id, "eu-west-1:pool");
        assert_eq!(
            provider.client.config().region().map(|r| r.as_ref()),
            Some("eu-west-1")
        );
    }
}
