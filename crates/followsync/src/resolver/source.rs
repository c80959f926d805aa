use crate::UpstreamError;
use core::fmt;

/// Which of a user's two relation lists to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Accounts the user follows.
    Following,
    /// Accounts that follow the user.
    Followers,
}

impl Direction {
    /// The opposite list.
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Following => Self::Followers,
            Self::Followers => Self::Following,
        }
    }

    /// Path segment used by the listing service.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Followers => "followers",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paginated relation-listing service.
///
/// Implementations return one ordered page of usernames starting at `offset`
/// and holding at most `limit` entries. A page shorter than `limit` marks the
/// end of the list. Failures are reported but never propagated past the
/// resolver: they count as an empty page.
pub trait RelationSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        subject: &str,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, UpstreamError>> + Send;
}

impl<S: RelationSource> RelationSource for std::sync::Arc<S> {
    fn fetch_page(
        &self,
        subject: &str,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, UpstreamError>> + Send {
        (**self).fetch_page(subject, direction, offset, limit)
    }
}
