pub mod aggregate;
pub mod catalog;
pub mod collate;
pub mod error;
pub mod progress;
pub mod session;
pub mod source;
pub mod watchlist;

pub use aggregate::{Aggregator, Liveness, RowMode, RowRequest};
pub use catalog::{Catalog, ResolvedEpisode};
pub use collate::{compare_titles, sort_by_title};
pub use error::{CoreError, CoreResult};
pub use progress::{
    display_progress, progress_fraction, resume_point, PersistOutcome, PlaybackSession, PlaybackState,
    PlaybackTarget, ProgressSettings, ResumePoint, ResumeReason, SavedPosition, SkipReason,
};
pub use session::{
    auth_error_message, AdminGate, Identity, IdentityFailure, IdentityService, LoginThrottle, SessionManager,
    SessionProvider, ThrottleState,
};
pub use source::{probe_first_playable, resolve_video_source, CandidateCursor, VideoSource};
pub use watchlist::Watchlist;
