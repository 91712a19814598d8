use crate::bot::handlers::{self, is_bot_added};
use crate::bot::TelegramTransport;
use crate::config::{BotSettings, SHUTDOWN_GRACE_PERIOD};
use crate::health::HealthPing;
use inline_limiter_core::decay::DecayTask;
use inline_limiter_core::moderation::Moderator;
use inline_limiter_core::notify::Notifier;
use inline_limiter_core::queue::{DelayedActionQueue, DrainTask};
use inline_limiter_core::registry::GroupRegistry;
use inline_limiter_core::scheduler::{spawn_periodic, PeriodicTask};
use inline_limiter_core::storage::{JsonFileStore, KvStore};
use inline_limiter_core::summary::SummaryReporter;
use inline_limiter_core::transport::ChatTransport;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::Me;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the Telegram transport runtime until Ctrl-C.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let store = init_storage(&settings).await;

    let bot = Bot::new(settings.telegram.bot_token.clone());
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));

    let registry = Arc::new(
        GroupRegistry::load(settings.limiter.default_setup(), store.clone()).await,
    );
    let queue = Arc::new(DelayedActionQueue::load(store.clone()).await);
    info!("Restored {} pending deletions.", queue.len().await);
    let notifier = Notifier::new(transport.clone(), queue.clone());
    let summary = Arc::new(
        SummaryReporter::load(
            registry.clone(),
            notifier.clone(),
            store,
            settings.limiter.as_ref(),
        )
        .await,
    );
    let moderator = Arc::new(Moderator::new(
        registry.clone(),
        notifier.clone(),
        settings.limiter.clone(),
    ));

    let mut tasks: Vec<Arc<dyn PeriodicTask>> = vec![
        Arc::new(DecayTask::new(registry.clone())),
        summary,
        Arc::new(DrainTask::new(queue, transport)),
    ];
    if let Some(health) = init_health_ping(&settings) {
        tasks.push(health);
    }
    let cancel = CancellationToken::new();
    let handles: Vec<JoinHandle<()>> = tasks
        .into_iter()
        .map(|task| spawn_periodic(task, cancel.clone()))
        .collect();

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![moderator, notifier])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Periodic task ended abnormally: {}", e);
        }
    }
    registry.checkpoint().await;
    tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
    info!("Bye.");
}

async fn init_storage(settings: &BotSettings) -> Arc<dyn KvStore> {
    match JsonFileStore::open(settings.limiter.data_dir.clone()).await {
        Ok(store) => {
            info!("JSON storage initialized at {}.", store.root().display());
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_health_ping(settings: &BotSettings) -> Option<Arc<dyn PeriodicTask>> {
    let url = settings.telegram.health_url()?;
    match HealthPing::new(url, settings.telegram.health_ping_interval()) {
        Ok(ping) => {
            info!(
                "Health ping enabled (every {}s).",
                settings.telegram.health_ping_interval().as_secs()
            );
            Some(Arc::new(ping))
        }
        Err(e) => {
            error!("Failed to initialize health ping: {}", e);
            None
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(dptree::filter(|msg: Message, me: Me| is_bot_added(&msg, &me)).endpoint(handle_join))
        .branch(dptree::endpoint(handle_message))
}

async fn handle_join(msg: Message, notifier: Notifier) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::greet(msg, &notifier).await {
        error!("Join handler error: {}", e);
    }
    respond(())
}

async fn handle_message(
    msg: Message,
    moderator: Arc<Moderator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::moderate(msg, &moderator).await {
        error!("Message handler error: {}", e);
    }
    respond(())
}
