//! Telegram bot transport: connection, update loop and reply rendering.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use grammers_client::types::{CallbackQuery, Chat, Message, PackedChat};
use grammers_client::{
    Client, InputMessage, InvocationError, SenderPool, Update, UpdatesConfiguration, button,
    reply_markup, sender,
};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{StoredPhoto, UserDispatcher};
use crate::commands::{BotCommand, BotHandler, Incoming};
use crate::config::TelegramConfig;
use crate::conversation::UserId;
use crate::geocoding::AddressResolver;
use crate::listings::{ListingStore, PhotoRef};
use crate::presentation::{Keyboard, Notice, Outcome, Reply, TextReply};

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        // Check for flood wait errors
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// How long a user's update worker is kept after their last update.
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Interval between sweeps for idle update workers.
const WORKER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["flood_wait_", "flood wait "];
    // ASCII lowercasing keeps byte offsets valid for `err_msg`
    let lowered = err_msg.to_ascii_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(pattern) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Connected and signed-in bot account.
pub struct TelegramBot {
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects, signs in as a bot and serves updates until `shutdown`
    /// resolves.
    ///
    /// Updates of one user, and the replies to them, are handled in arrival
    /// order on that user's worker task. Different users are served in
    /// parallel.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, signing in or reading updates fails.
    pub async fn serve<S, R>(
        config: &TelegramConfig,
        handler: Arc<BotHandler<S, R>>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TelegramError>
    where
        S: ListingStore + 'static,
        R: AddressResolver + 'static,
    {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let bot = Self {
            client,
            handle: handle.thin,
            _pool_task: pool_task,
        };
        bot.sign_in(config).await?;
        bot.register_commands().await;

        let mut stream = bot
            .client
            .stream_updates(
                updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        info!("Bot is running. Use Ctrl+C to stop.");
        tokio::pin!(shutdown);

        let client = bot.client.clone();
        let mut dispatcher = UserDispatcher::new(WORKER_IDLE_TIMEOUT, move |update: Update| {
            let client = client.clone();
            let handler = Arc::clone(&handler);
            async move {
                if let Err(e) = handle_update(&client, &handler, update).await {
                    warn!("Failed to handle update: {}", e);
                }
            }
        });

        let mut sweep = tokio::time::interval(WORKER_SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let update = tokio::select! {
                () = &mut shutdown => break,
                _ = sweep.tick() => {
                    let stopped = dispatcher.remove_idle();
                    if stopped > 0 {
                        debug!("Stopped {} idle update worker(s)", stopped);
                    }
                    continue;
                }
                update = stream.next() => update.map_err(TelegramError::from)?,
            };

            if let Some(user) = update_user(&update) {
                dispatcher.dispatch(user, update);
            }
        }

        stream.sync_update_state().await;
        bot.disconnect();
        Ok(())
    }

    async fn sign_in(&self, config: &TelegramConfig) -> Result<(), TelegramError> {
        let authorized = self
            .client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        if authorized {
            info!("Connected to Telegram. Session already authorized");
            return Ok(());
        }

        info!("Signing in with bot token...");
        self.client
            .bot_sign_in(&config.bot_token, &config.api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
        info!("Successfully signed in!");
        Ok(())
    }

    /// Publishes the slash command list shown by Telegram clients.
    async fn register_commands(&self) {
        let commands = BotCommand::all_commands()
            .into_iter()
            .map(|(command, description)| {
                tl::types::BotCommand {
                    command: command.trim_start_matches('/').to_owned(),
                    description: description.to_owned(),
                }
                .into()
            })
            .collect();

        let request = tl::functions::bots::SetBotCommands {
            scope: tl::enums::BotCommandScope::Default,
            lang_code: String::new(),
            commands,
        };

        if let Err(e) = self.client.invoke(&request).await {
            warn!("Failed to register bot commands: {}", e);
        }
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// The user whose conversation an update belongs to, if it is handled.
fn update_user(update: &Update) -> Option<UserId> {
    match update {
        Update::NewMessage(message) if !message.outgoing() => Some(message.chat().id()),
        Update::CallbackQuery(query) => Some(query.sender().id()),
        _ => None,
    }
}

async fn handle_update<S, R>(
    client: &Client,
    handler: &BotHandler<S, R>,
    update: Update,
) -> Result<(), TelegramError>
where
    S: ListingStore,
    R: AddressResolver,
{
    match update {
        Update::NewMessage(message) if !message.outgoing() => {
            on_message(client, handler, &message).await
        }
        Update::CallbackQuery(query) => on_callback(client, handler, &query).await,
        _ => Ok(()),
    }
}

async fn on_message<S, R>(
    client: &Client,
    handler: &BotHandler<S, R>,
    message: &Message,
) -> Result<(), TelegramError>
where
    S: ListingStore,
    R: AddressResolver,
{
    // Conversations only happen in private chats
    let chat = message.chat();
    let Chat::User(user) = &chat else {
        debug!("Ignoring message from non-private chat {}", chat.id());
        return Ok(());
    };

    let incoming = if let Some(photo) = message.photo() {
        match photo.raw.photo.as_ref().and_then(StoredPhoto::from_raw) {
            Some(stored) => Incoming::Photo(stored.encode()),
            None => return Ok(()),
        }
    } else if !message.text().is_empty() {
        Incoming::Text(message.text().to_owned())
    } else {
        return Ok(());
    };

    let outcome = handler.handle(user.id(), incoming).await;
    send_replies(client, chat.pack(), outcome.replies).await
}

async fn on_callback<S, R>(
    client: &Client,
    handler: &BotHandler<S, R>,
    query: &CallbackQuery,
) -> Result<(), TelegramError>
where
    S: ListingStore,
    R: AddressResolver,
{
    let user = query.sender().id();
    let data = String::from_utf8_lossy(query.data()).into_owned();

    let Outcome { replies, notice } = handler.handle(user, Incoming::Callback(data)).await;

    // Always answer so the client stops showing a spinner
    let answer = query.answer();
    let answer = match notice {
        Some(Notice { text, alert: true }) => answer.alert(text),
        Some(Notice { text, alert: false }) => answer.text(text),
        None => answer,
    };
    answer.send().await?;

    send_replies(client, query.chat().pack(), replies).await
}

async fn send_replies(
    client: &Client,
    chat: PackedChat,
    replies: Vec<Reply>,
) -> Result<(), TelegramError> {
    for reply in replies {
        let result = match reply {
            Reply::Text(text) => client
                .send_message(chat, input_message(text))
                .await
                .map(|_| ()),
            Reply::Album(photos) => send_album(client, chat, &photos).await,
        };

        if let Err(e) = result {
            let err: TelegramError = e.into();
            if let TelegramError::FloodWait(seconds) = &err {
                warn!("Flood wait triggered: {} seconds", seconds);
            }
            return Err(err);
        }
    }
    Ok(())
}

fn input_message(reply: TextReply) -> InputMessage {
    let message = if reply.html {
        InputMessage::html(reply.text)
    } else {
        InputMessage::text(reply.text)
    };

    match reply.keyboard {
        Some(Keyboard::Inline(rows)) => message.reply_markup(&reply_markup::inline(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|b| button::inline(b.text, b.data.into_bytes()))
                        .collect()
                })
                .collect(),
        )),
        Some(Keyboard::Menu(rows)) => message.reply_markup(
            &reply_markup::keyboard(
                rows.into_iter()
                    .map(|row| row.into_iter().map(button::text).collect())
                    .collect(),
            )
            .fit_size(),
        ),
        None => message,
    }
}

/// Sends stored photos as one album, or a single photo.
async fn send_album(
    client: &Client,
    chat: PackedChat,
    photos: &[PhotoRef],
) -> Result<(), InvocationError> {
    let mut media: Vec<tl::enums::InputMedia> = photos
        .iter()
        .filter_map(|photo| {
            let stored = StoredPhoto::decode(photo);
            if stored.is_none() {
                error!("Skipping malformed photo reference {:?}", photo.as_str());
            }
            stored
        })
        .map(|stored| stored.to_input_media())
        .collect();

    let peer = chat.to_input_peer();
    match media.len() {
        0 => Ok(()),
        1 => {
            let Some(single) = media.pop() else {
                return Ok(());
            };
            let request = tl::functions::messages::SendMedia {
                silent: false,
                background: false,
                clear_draft: false,
                noforwards: false,
                update_stickersets_order: false,
                invert_media: false,
                allow_paid_floodskip: false,
                peer,
                reply_to: None,
                media: single,
                message: String::new(),
                random_id: rand::random(),
                reply_markup: None,
                entities: None,
                schedule_date: None,
                send_as: None,
                quick_reply_shortcut: None,
                effect: None,
                allow_paid_stars: None,
            };
            client.invoke(&request).await.map(|_| ())
        }
        _ => {
            let multi_media = media
                .into_iter()
                .map(|media| {
                    tl::types::InputSingleMedia {
                        media,
                        random_id: rand::random(),
                        message: String::new(),
                        entities: None,
                    }
                    .into()
                })
                .collect();

            let request = tl::functions::messages::SendMultiMedia {
                silent: false,
                background: false,
                clear_draft: false,
                noforwards: false,
                update_stickersets_order: false,
                invert_media: false,
                allow_paid_floodskip: false,
                peer,
                reply_to: None,
                multi_media,
                schedule_date: None,
                send_as: None,
                quick_reply_shortcut: None,
                effect: None,
                allow_paid_stars: None,
            };
            client.invoke(&request).await.map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(
            extract_flood_wait_seconds("rpc error 420: FLOOD_WAIT_7 caused by sendMessage"),
            Some(7)
        );
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_extract_flood_wait_after_non_ascii_text() {
        assert_eq!(extract_flood_wait_seconds("İİ flood wait 45 seconds"), Some(45));
        assert_eq!(
            extract_flood_wait_seconds("Ошибка: FLOOD_WAIT_30 при отправке"),
            Some(30)
        );
        assert_eq!(extract_flood_wait_seconds("ẞẞẞ Flood Wait x"), None);
    }
}
