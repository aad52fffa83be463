pub mod accounts;
pub mod engagement;
pub mod fanout;
pub mod feed;
pub mod graph;

pub use accounts::Accounts;
pub use engagement::Engagement;
pub use fanout::Notifications;
pub use feed::Feed;
pub use graph::SocialGraph;
