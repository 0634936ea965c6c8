pub mod ranking;
pub mod repository;
pub mod search;
pub mod tags;

pub use ranking::RankedPost;
pub use repository::{NewPost, PostStats};
pub use search::SearchHit;
pub use tags::normalize_tags;
