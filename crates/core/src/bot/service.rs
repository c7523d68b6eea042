//! Bot service.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_common::BotConfig;
use beacon_db::repositories::RecipientProfile;
use beacon_queue::{AnimationSource, Dispatcher, Messenger, MessengerError, Payload, SendTask};
use tracing::{debug, info, warn};

use super::broadcast::BroadcastRequest;
use super::directory::Directory;
use super::messages::{
    BROADCAST_USAGE, NOT_AUTHORIZED, WELCOME_CAPTION, broadcast_queued, group_keyboard,
    group_welcome, main_keyboard, start_in_private,
};
use super::throttle::WelcomeThrottle;
use crate::telegram::{CallbackQuery, Message, TelegramClient, Update, User};

/// Callback data of the "back to main menu" button.
const MAIN_MENU: &str = "main";

/// Direct Bot API access for replies that bypass the dispatcher.
#[async_trait]
pub trait BotApi: Messenger {
    /// Acknowledge a callback query so the client stops its spinner.
    async fn answer_callback(&self, callback_query_id: &str) -> Result<(), MessengerError>;
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn answer_callback(&self, callback_query_id: &str) -> Result<(), MessengerError> {
        self.answer_callback_query(callback_query_id, None).await?;
        Ok(())
    }
}

/// Handler settings derived from [`BotConfig`].
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Username of the bot, without `@`.
    pub bot_username: String,
    /// Users allowed to broadcast.
    pub admin_users: Vec<i64>,
    /// Welcome animation on disk.
    pub media_path: PathBuf,
    /// Mini app opened by "Open App".
    pub mini_app_url: String,
    /// Announcement channel.
    pub channel_url: String,
    /// Discussion group.
    pub discussion_url: String,
    /// Partnerships and support contact.
    pub support_url: String,
    /// Deep link that starts the bot privately from a group.
    pub bot_link: String,
}

impl BotSettings {
    /// Build settings for the bot named `bot_username`.
    #[must_use]
    pub fn from_config(config: &BotConfig, bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            admin_users: config.admin_users.clone(),
            media_path: config.media_path.clone(),
            mini_app_url: config.mini_app_url.clone(),
            channel_url: config.channel_url.clone(),
            discussion_url: config.discussion_url.clone(),
            support_url: config.support_url.clone(),
            bot_link: config.bot_link.clone(),
        }
    }

    /// Whether `user_id` may run operator commands.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_users.contains(&user_id)
    }
}

/// Routes updates to handlers.
#[derive(Clone)]
pub struct BotService {
    api: Arc<dyn BotApi>,
    directory: Arc<dyn Directory>,
    dispatcher: Dispatcher,
    settings: Arc<BotSettings>,
    throttle: Arc<WelcomeThrottle>,
}

impl BotService {
    /// Create a new bot service.
    #[must_use]
    pub fn new(
        api: Arc<dyn BotApi>,
        directory: Arc<dyn Directory>,
        dispatcher: Dispatcher,
        settings: BotSettings,
    ) -> Self {
        Self {
            api,
            directory,
            dispatcher,
            settings: Arc::new(settings),
            throttle: Arc::new(WelcomeThrottle::default()),
        }
    }

    /// Replace the group welcome throttle.
    #[must_use]
    pub fn with_throttle(mut self, throttle: WelcomeThrottle) -> Self {
        self.throttle = Arc::new(throttle);
        self
    }

    /// Dispatcher used for outbound messages.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one update. Errors are logged, never returned.
    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;
        let result = if let Some(query) = update.callback_query {
            self.on_callback(&query).await
        } else if let Some(message) = update.message {
            self.on_message(&message).await
        } else {
            debug!(update_id, "Ignoring update without message or callback");
            Ok(())
        };

        if let Err(e) = result {
            warn!(update_id, error = %e, "Failed to handle update");
        }
    }

    async fn on_message(&self, message: &Message) -> Result<(), MessengerError> {
        if !message.new_chat_members.is_empty() {
            self.greet_new_members(message);
            return Ok(());
        }

        let Some(command) = message.command() else {
            return Ok(());
        };
        if !command.is_for(&self.settings.bot_username) {
            return Ok(());
        }

        match command.name {
            "start" => {
                let start_param = command.args.split_whitespace().next().unwrap_or_default();
                self.on_start(message, start_param).await;
                Ok(())
            }
            "broadcast" => self.on_broadcast(message, command.args).await,
            other => {
                debug!(command = other, chat_id = message.chat.id, "Ignoring unknown command");
                Ok(())
            }
        }
    }

    async fn on_start(&self, message: &Message, start_param: &str) {
        info!(chat_id = message.chat.id, start_param, "/start received");

        if !message.chat.is_private() {
            self.dispatcher.enqueue_interactive(
                message.chat.id,
                Payload::text(start_in_private(&self.settings.bot_username)),
            );
            self.dispatcher.ensure_worker_running();
            return;
        }

        if let Some(user) = &message.from {
            self.welcome(user, message.chat.id, start_param).await;
        }
    }

    async fn on_callback(&self, query: &CallbackQuery) -> Result<(), MessengerError> {
        if let Err(e) = self.api.answer_callback(&query.id).await {
            warn!(callback_query_id = %query.id, error = %e, "Failed to answer callback query");
        }

        match query.data.as_deref() {
            Some(MAIN_MENU) => self.welcome(&query.from, query.from.id, "").await,
            other => debug!(data = ?other, "Ignoring callback query"),
        }
        Ok(())
    }

    /// Enroll `user` and queue the private welcome to `chat_id`.
    async fn welcome(&self, user: &User, chat_id: i64, start_param: &str) {
        let profile = RecipientProfile {
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
            start_param: (!start_param.is_empty()).then(|| start_param.to_string()),
            ..RecipientProfile::new(user.id)
        };

        match self.directory.enroll(profile).await {
            Some(created) => debug!(user_id = user.id, created, "Recipient enrolled"),
            None => warn!(user_id = user.id, "Directory unavailable, welcoming without enrollment"),
        }

        let payload = Payload::animation(
            AnimationSource::LocalAsset(self.settings.media_path.clone()),
            WELCOME_CAPTION,
        )
        .with_keyboard(main_keyboard(&self.settings, start_param));

        self.dispatcher.enqueue_interactive(chat_id, payload);
        self.dispatcher.ensure_worker_running();
    }

    fn greet_new_members(&self, message: &Message) {
        for member in &message.new_chat_members {
            if member.is_bot {
                continue;
            }
            if !self.throttle.try_acquire() {
                debug!(chat_id = message.chat.id, "Group welcome throttled");
                return;
            }

            let payload = Payload::text(group_welcome(member, &self.settings.bot_username))
                .with_keyboard(group_keyboard(&self.settings));
            self.dispatcher.enqueue_interactive(message.chat.id, payload);
            self.dispatcher.ensure_worker_running();
        }
    }

    async fn on_broadcast(&self, message: &Message, args: &str) -> Result<(), MessengerError> {
        let chat_id = message.chat.id;
        let sender = message.from.as_ref().map(|u| u.id);

        if !sender.is_some_and(|id| self.settings.is_admin(id)) {
            warn!(chat_id, sender = ?sender, "Unauthorized broadcast attempt");
            return self.reply(chat_id, NOT_AUTHORIZED).await;
        }

        let Some(request) =
            BroadcastRequest::parse(args, message.largest_photo(), &self.settings.mini_app_url)
        else {
            return self.reply(chat_id, BROADCAST_USAGE).await;
        };

        let payload = request.payload();
        let recipients = self.directory.recipient_ids().await;
        let queued = self.dispatcher.enqueue_batch(
            recipients
                .into_iter()
                .map(|id| SendTask::broadcast(id, payload.clone())),
        );
        self.dispatcher.ensure_worker_running();

        info!(
            sender = ?sender,
            queued,
            kind = payload.kind(),
            buttons = request.keyboard.rows().len(),
            "Broadcast queued"
        );
        self.reply(chat_id, &broadcast_queued(queued)).await
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), MessengerError> {
        self.api.send(chat_id, &Payload::text(text)).await?;
        Ok(())
    }
}
