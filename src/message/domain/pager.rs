//! Paginated read view over the message backlog.

use super::{Message, MessageDomainError, MessageState};

/// Fields a pager may sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    /// Message type.
    Type,
    /// Lifecycle state.
    State,
    /// Restart count.
    RestartCount,
    /// Creation timestamp.
    CreatedAt,
    /// Latest state change timestamp.
    UpdatedAt,
    /// Claim timestamp.
    StartedAt,
    /// Completion timestamp.
    CompletedAt,
}

impl SortField {
    /// Returns the public field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::State => "state",
            Self::RestartCount => "restart_count",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::StartedAt => "started_at",
            Self::CompletedAt => "completed_at",
        }
    }
}

impl TryFrom<&str> for SortField {
    type Error = MessageDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "type" => Ok(Self::Type),
            "state" => Ok(Self::State),
            "restart_count" | "restartCount" => Ok(Self::RestartCount),
            "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "updated_at" | "updatedAt" => Ok(Self::UpdatedAt),
            "started_at" | "startedAt" => Ok(Self::StartedAt),
            "completed_at" | "completedAt" => Ok(Self::CompletedAt),
            _ => Err(MessageDomainError::InvalidSortField(value.to_owned())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl TryFrom<&str> for SortDirection {
    type Error = MessageDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(MessageDomainError::InvalidSortDirection(value.to_owned())),
        }
    }
}

/// Validated, ordered list of sort keys.
///
/// An empty sort falls back to `type` ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSort(Vec<(SortField, SortDirection)>);

impl MessageSort {
    /// Builds a sort from already-typed keys.
    #[must_use]
    pub fn new(keys: Vec<(SortField, SortDirection)>) -> Self {
        if keys.is_empty() {
            return Self::default();
        }
        Self(keys)
    }

    /// Parses a `field → direction` mapping.
    ///
    /// Every field is validated before any key is accepted, so an invalid
    /// entry fails the whole sort.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidSortField`] for unknown fields and
    /// [`MessageDomainError::InvalidSortDirection`] for unknown directions.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, MessageDomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let keys = pairs
            .into_iter()
            .map(|(field, direction)| {
                Ok((
                    SortField::try_from(field.as_ref())?,
                    SortDirection::try_from(direction.as_ref())?,
                ))
            })
            .collect::<Result<Vec<_>, MessageDomainError>>()?;
        Ok(Self::new(keys))
    }

    /// Returns the sort keys in priority order.
    #[must_use]
    pub fn keys(&self) -> &[(SortField, SortDirection)] {
        &self.0
    }
}

impl Default for MessageSort {
    fn default() -> Self {
        Self(vec![(SortField::Type, SortDirection::Asc)])
    }
}

/// Optional equality filters for the pager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagerCriteria {
    /// Restrict to one message type.
    pub message_type: Option<String>,
    /// Restrict to one state.
    pub state: Option<MessageState>,
}

impl PagerCriteria {
    /// Creates criteria matching every message.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the pager to one message type.
    #[must_use]
    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Restricts the pager to one state.
    #[must_use]
    pub const fn with_state(mut self, state: MessageState) -> Self {
        self.state = Some(state);
        self
    }

    /// Returns `true` when `message` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let type_matches = self
            .message_type
            .as_deref()
            .is_none_or(|t| t == message.message_type());
        let state_matches = self.state.is_none_or(|s| s == message.state());
        type_matches && state_matches
    }
}

/// One-based page position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Default number of messages per page.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Creates a validated page request.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidPage`] when either value is zero.
    pub const fn new(page: u32, page_size: u32) -> Result<Self, MessageDomainError> {
        if page == 0 || page_size == 0 {
            return Err(MessageDomainError::InvalidPage { page, page_size });
        }
        Ok(Self { page, page_size })
    }

    /// Returns the one-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn page_size(self) -> u32 {
        self.page_size
    }

    /// Returns the number of rows preceding this page.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// One page of messages plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    /// Messages on this page, in sort order.
    pub items: Vec<Message>,
    /// The page that was requested.
    pub request: PageRequest,
    /// Number of messages matching the criteria across all pages.
    pub total: u64,
}

impl MessagePage {
    /// Returns the number of the last non-empty page (at least 1).
    #[must_use]
    pub fn last_page(&self) -> u64 {
        let size = u64::from(self.request.page_size());
        self.total.div_ceil(size).max(1)
    }
}
