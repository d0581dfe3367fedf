//! Twitter v2 API client: user lookup and the paginated following-list.
//!
//! - [`client`] - authenticated requests, pagination loop, error payload decoding
//! - [`types`] - serde models of the response bodies

mod client;
mod types;

pub use client::{ApiError, FollowingPage, TwitterApi, RATE_LIMIT_HEADER};
pub use types::{FollowingResponse, Meta, Problem, User, UserLookupResponse};
