//! Finds the RSS/Atom feeds of the accounts a Twitter user follows and
//! exports them as an OPML subscription list.
//!
//! The flow is linear: [`twitter::TwitterApi`] resolves the user and pages
//! through the following-list, [`feed::FeedCollector`] fetches homepages in
//! concurrent batches, and [`feed::export_opml`] renders the result.
//! [`pipeline::FriendFeeder`] ties the steps together.

pub mod config;
pub mod feed;
pub mod friend;
pub mod http;
pub mod pipeline;
pub mod twitter;
pub mod util;
