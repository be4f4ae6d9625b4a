//! Runtime adapters for the workout sync pipeline: IMAP mailbox, SMTP
//! notifications, the Strava HTTP API and the TOML configuration that
//! wires them together.

pub mod config;
pub mod imap_client;
pub mod smtp;
pub mod strava;

use std::sync::Arc;

use anyhow::Result;
use workout_core::ports::{ActivityApi, SystemClock, TokenExchange};
use workout_core::{
    ActivityMatcher, ActivityUpdater, PipelineOrchestrator, TokenCache, WorkoutTextExtractor,
};

use config::Config;
use imap_client::ImapMailbox;
use smtp::SmtpMailer;
use strava::StravaClient;

/// Wire the production adapters into an orchestrator
pub fn build_pipeline(config: &Config) -> Result<PipelineOrchestrator> {
    let strava = Arc::new(StravaClient::from_config(&config.strava));
    let exchange: Arc<dyn TokenExchange> = strava.clone();
    let api: Arc<dyn ActivityApi> = strava;

    let tokens = Arc::new(TokenCache::new(
        exchange,
        Arc::new(SystemClock),
        config.refresh_credentials(),
    ));

    let extractor = WorkoutTextExtractor::new(config.workout_zone()?);
    let matcher = ActivityMatcher::new(api.clone(), tokens.clone());
    let updater = ActivityUpdater::new(api, tokens);

    let orchestrator = PipelineOrchestrator::new(
        Arc::new(ImapMailbox::new(config.imap.clone())),
        Arc::new(SmtpMailer::new(config.smtp.clone())),
        extractor,
        matcher,
        updater,
    )
    .with_link_prefix(config.workout.link_prefix.clone());

    Ok(orchestrator)
}
