//! Transport-neutral outgoing messages.
//!
//! Handlers describe what to show; the Telegram layer decides how.

use crate::listings::PhotoRef;

/// Telegram accepts at most this many items per album; we send smaller
/// groups to keep cards readable.
pub const ALBUM_CHUNK: usize = 5;

/// A button attached under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    #[must_use]
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Keyboard shown with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons under the message that produce callback queries.
    Inline(Vec<Vec<InlineButton>>),

    /// Persistent menu replacing the user's keyboard; pressing a button
    /// sends its label as text.
    Menu(Vec<Vec<String>>),
}

impl Keyboard {
    /// One inline button per row.
    #[must_use]
    pub fn inline_column(buttons: Vec<InlineButton>) -> Self {
        Self::Inline(buttons.into_iter().map(|b| vec![b]).collect())
    }

    /// Iterates over inline buttons; empty for menus.
    pub fn inline_buttons(&self) -> impl Iterator<Item = &InlineButton> {
        let rows: &[Vec<InlineButton>] = match self {
            Self::Inline(rows) => rows,
            Self::Menu(_) => &[],
        };
        rows.iter().flatten()
    }
}

/// Text message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub text: String,
    /// Whether `text` contains HTML markup.
    pub html: bool,
    pub keyboard: Option<Keyboard>,
}

/// One outgoing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(TextReply),
    Album(Vec<PhotoRef>),
}

impl Reply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextReply {
            text: text.into(),
            html: false,
            keyboard: None,
        })
    }

    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self::Text(TextReply {
            text: text.into(),
            html: true,
            keyboard: None,
        })
    }

    #[must_use]
    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self::Text(TextReply {
            text: text.into(),
            html: false,
            keyboard: Some(keyboard),
        })
    }

    /// Splits photos into albums of [`ALBUM_CHUNK`].
    #[must_use]
    pub fn albums(photos: &[PhotoRef]) -> Vec<Self> {
        photos
            .chunks(ALBUM_CHUNK)
            .map(|chunk| Self::Album(chunk.to_vec()))
            .collect()
    }

    /// Text of a text reply.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(reply) => Some(&reply.text),
            Self::Album(_) => None,
        }
    }

    #[must_use]
    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Self::Text(reply) => reply.keyboard.as_ref(),
            Self::Album(_) => None,
        }
    }
}

/// Answer to a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    /// Modal alert instead of a toast.
    pub alert: bool,
}

/// Everything produced by handling one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub replies: Vec<Reply>,
    pub notice: Option<Notice>,
}

impl Outcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            notice: None,
        }
    }

    /// Only an alert, no messages.
    #[must_use]
    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            replies: Vec::new(),
            notice: Some(Notice {
                text: text.into(),
                alert: true,
            }),
        }
    }

    pub fn push(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    pub fn extend(&mut self, replies: impl IntoIterator<Item = Reply>) {
        self.replies.extend(replies);
    }

    #[must_use]
    pub fn with_toast(mut self, text: impl Into<String>) -> Self {
        self.notice = Some(Notice {
            text: text.into(),
            alert: false,
        });
        self
    }

    /// Texts of all text replies, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.replies.iter().filter_map(Reply::as_text)
    }
}
