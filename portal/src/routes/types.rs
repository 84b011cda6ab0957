use serde::{Deserialize, Serialize};

use crate::{
    sentiment::FeedbackSentiment,
    storage::{FeedbackRecord, UserRecord},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
}

/// Public view of a user record; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub user_type: String,
    pub created_at: String,
    pub is_active: bool,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            username: record.username,
            full_name: record.full_name,
            user_type: record.role.as_str().to_string(),
            created_at: record.created_at,
            is_active: record.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub file_path: String,
    pub text_filename: String,
    pub text_path: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentContentResponse {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub feedback: Vec<FeedbackRecord>,
    pub sentiment_analysis: FeedbackSentiment,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
