use serde::Deserialize;

use crate::friend::Friend;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub url: Option<String>,
}

impl From<User> for Friend {
    fn from(user: User) -> Self {
        Friend::new(user.username, user.url)
    }
}

/// Response of `GET /users/by/username/:username`.
///
/// An unknown username comes back as 200 with `errors` and no `data`.
#[derive(Debug, Deserialize)]
pub struct UserLookupResponse {
    #[serde(default)]
    pub data: Option<User>,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

/// Response of `GET /users/:id/following`.
///
/// `data` is omitted entirely when the account follows nobody.
#[derive(Debug, Deserialize)]
pub struct FollowingResponse {
    #[serde(default)]
    pub data: Vec<User>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub result_count: Option<u32>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Error object, either top-level on non-2xx responses or inside `errors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}
