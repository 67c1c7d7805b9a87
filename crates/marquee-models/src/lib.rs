pub mod title;
pub mod season;
pub mod watchlist;
pub mod progress;
pub mod row;

pub use title::{Movie, Series, Title, TitleInfo, TitleKind};
pub use season::{Episode, EpisodeRef, Season, SeasonPlan};
pub use watchlist::WatchlistEntry;
pub use progress::{ProgressRecord, UserRecord, WatchingRecord, WatchingSummary};
pub use row::{RowData, RowItem};
