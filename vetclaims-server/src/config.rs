//! Command line and environment configuration.

use crate::AppState;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vetclaims_crypto::{EncryptionService, KdfParams};
use vetclaims_identity::{
    DisabledIdentityProvider, IdentityProvider, SupabaseConfig, SupabaseIdentityProvider,
};
use vetclaims_mail::{Mailer, MailgunConfig, MailgunMailer, MailgunRegion, UnconfiguredMailer};
use vetclaims_profile::ProfileService;
use vetclaims_storage::SqliteProfileStore;

#[derive(Parser, Debug, Clone)]
#[command(name = "vetclaims-server")]
#[command(about = "Vets4Claims backend: veteran profiles, SSN encryption and claim email")]
pub struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Address to bind
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// Path to the SQLite database
    #[arg(long = "database", env = "DATABASE_PATH", default_value = "vetclaims.db")]
    pub database: PathBuf,

    /// Secret the SSN encryption key is derived from
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: String,

    /// Retired secrets still accepted for decryption
    #[arg(
        long,
        env = "PREVIOUS_ENCRYPTION_KEYS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub previous_encryption_keys: Vec<String>,

    /// Supabase project URL; identity verification is disabled without it
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: Option<String>,

    #[arg(long, env = "MAILGUN_API_KEY", hide_env_values = true)]
    pub mailgun_api_key: Option<String>,

    #[arg(long, env = "MAILGUN_DOMAIN")]
    pub mailgun_domain: Option<String>,

    /// `US` or `EU`
    #[arg(long, env = "MAILGUN_REGION", default_value = "US")]
    pub mailgun_region: String,

    #[arg(long, env = "MAILGUN_FROM_EMAIL")]
    pub mailgun_from_email: Option<String>,

    #[arg(long, env = "MAILGUN_FROM_NAME")]
    pub mailgun_from_name: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Re-seal stored SSNs under the active key, then exit
    #[arg(long)]
    pub reencrypt: bool,
}

impl Args {
    /// Identity provider settings, if a Supabase URL is configured.
    pub fn supabase_config(&self) -> Option<SupabaseConfig> {
        let base_url = non_empty(self.supabase_url.as_deref())?;
        Some(SupabaseConfig {
            base_url: base_url.to_string(),
            anon_key: non_empty(self.supabase_anon_key.as_deref()).map(str::to_string),
            ..Default::default()
        })
    }

    /// Mailgun settings, if both an API key and a domain are configured.
    pub fn mailgun_config(&self) -> Option<MailgunConfig> {
        let api_key = non_empty(self.mailgun_api_key.as_deref())?;
        let domain = non_empty(self.mailgun_domain.as_deref())?;
        let mut config = MailgunConfig {
            api_key: api_key.to_string(),
            domain: domain.to_string(),
            region: MailgunRegion::from_name(&self.mailgun_region),
            ..Default::default()
        };
        if let Some(from) = non_empty(self.mailgun_from_email.as_deref()) {
            config.from_email = from.to_string();
        }
        if let Some(name) = non_empty(self.mailgun_from_name.as_deref()) {
            config.from_name = name.to_string();
        }
        Some(config)
    }

    /// Builds the encryption service from the active and retired secrets.
    pub fn encryption_service(&self) -> Result<EncryptionService> {
        let params = KdfParams::default();
        let mut service = EncryptionService::from_secret(&self.encryption_key, &params)
            .context("ENCRYPTION_KEY is required")?;
        for secret in self.previous_encryption_keys.iter().map(|s| s.trim()) {
            if secret.is_empty() {
                continue;
            }
            service = service
                .with_retired_secret(secret, &params)
                .context("Failed to derive a previous encryption key")?;
        }
        Ok(service)
    }
}

/// Wires up every service the router needs.
pub fn build_state(args: &Args) -> Result<AppState> {
    let cipher = args.encryption_service()?;
    info!(
        "Encryption ready ({} retired key(s))",
        cipher.retired_key_count()
    );

    let store = SqliteProfileStore::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;
    info!("Database opened at {:?}", args.database);

    let identity: Arc<dyn IdentityProvider> = match args.supabase_config() {
        Some(config) => Arc::new(
            SupabaseIdentityProvider::new(config)
                .context("Failed to configure Supabase identity provider")?,
        ),
        None => {
            warn!("SUPABASE_URL not set, all profile requests are anonymous");
            Arc::new(DisabledIdentityProvider)
        }
    };

    let mailer: Arc<dyn Mailer> = match args.mailgun_config() {
        Some(config) => {
            Arc::new(MailgunMailer::new(config).context("Failed to configure Mailgun")?)
        }
        None => {
            warn!("Mailgun configuration missing, emails will be simulated");
            Arc::new(UnconfiguredMailer)
        }
    };

    let profiles = ProfileService::new(Arc::new(store), Arc::new(cipher), identity);
    Ok(AppState { profiles, mailer })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
