//! Request-scoped context handed to every service call

use chrono::{NaiveDate, Utc};

use crate::models::user::UserClaims;

/// Who is acting and what day it is for this request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: i32,
    pub username: String,
    pub today: NaiveDate,
}

impl RequestContext {
    pub fn new(user_id: i32, username: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            user_id,
            username: username.into(),
            today,
        }
    }
}

impl From<&UserClaims> for RequestContext {
    fn from(claims: &UserClaims) -> Self {
        Self::new(claims.user_id, claims.sub.clone(), Utc::now().date_naive())
    }
}
