use serde::{Deserialize, Serialize};

/// `User` entity payload (§3). Stored at `USR#{user_id}` / `META`,
/// projected onto GSI1 by email and GSI2 (hash-only) by OAuth id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
    pub external_oauth_id: String,
    pub plan_id: String,
    pub active: bool,
    pub staff: bool,
}

impl User {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, external_oauth_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: String::new(),
            picture_url: None,
            external_oauth_id: external_oauth_id.into(),
            plan_id: plan_id.into(),
            active: true,
            staff: false,
        }
    }
}
