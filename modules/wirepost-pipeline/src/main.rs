use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use llm_client::Gemini;
use stockphoto_client::{PexelsClient, UnsplashClient};
use wirepost_common::{Config, WirepostError};
use wirepost_pipeline::feeds::FeedReader;
use wirepost_pipeline::images::{ImagePicker, SourceBalancer};
use wirepost_pipeline::ledger::PostgresLedger;
use wirepost_pipeline::publish::LinkedInPublisher;
use wirepost_pipeline::run::{Outcome, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wirepost=info")),
        )
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let ledger = Arc::new(PostgresLedger::connect(&config.database_url).await?);
    ledger.migrate().await?;

    let lock = match ledger.try_lock_run().await {
        Ok(lock) => lock,
        Err(WirepostError::RunLockConflict) => {
            info!("Another run already holds the lock, nothing to do");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let result = run_once(&config, ledger.clone()).await;

    if let Err(e) = lock.release().await {
        warn!(error = %e, "Failed to release run lock");
    }

    match result {
        Ok(Outcome::Posted {
            topic,
            post_url,
            image,
            used_links,
            ..
        }) => {
            info!(
                topic = topic.as_str(),
                url = post_url.as_str(),
                with_image = image.is_some(),
                used_links,
                "Run finished with a published post"
            );
            Ok(())
        }
        Ok(Outcome::NothingToDo(reason)) => {
            info!(reason = reason.as_str(), "Run finished with nothing to publish");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            Err(e)
        }
    }
}

async fn run_once(config: &Config, ledger: Arc<PostgresLedger>) -> Result<Outcome> {
    let model = Arc::new(Gemini::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));

    let picker = ImagePicker::new(
        Arc::new(UnsplashClient::new(config.unsplash_access_key.clone())),
        Arc::new(PexelsClient::new(config.pexels_api_key.clone())),
        Arc::new(SourceBalancer::new()),
    );

    let publisher = Arc::new(LinkedInPublisher::new(
        config.linkedin_access_token.clone(),
        config.linkedin_person_urn.clone(),
    ));

    let pipeline = Pipeline::new(
        Arc::new(FeedReader::new()),
        ledger,
        model,
        picker,
        publisher,
    )
    .with_recency_hours(config.recency_hours)
    .with_model_rpm(config.model_rpm)
    .with_image_count(config.image_count);

    pipeline.run(&mut rand::rng()).await
}
