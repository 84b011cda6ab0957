use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use tracing::info;

use crate::{
    AppState,
    auth::{self, hash_password, verify_password},
    error::ApiError,
    storage::{NewUserRecord, UserRole},
};

use super::types::{
    CreateUserRequest, LoginRequest, LoginResponse, MessageResponse, UserResponse,
};

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login/", post(login))
        .route("/students/", get(list_students).post(create_student))
        .route("/faculty/", get(list_faculty).post(create_faculty))
        .route("/users/{user_id}", get(get_user).delete(delete_user))
        .route("/create-admin/", post(create_admin))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&credentials.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Authentication("Invalid email or password".to_string()))?;

    if !verify_password(&credentials.password, &user.password) {
        return Err(ApiError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    let access_token = state
        .auth
        .issue_token(&user.email)
        .map_err(ApiError::Internal)?;

    info!(email = %user.email, "user logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: user.into(),
    }))
}

async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    list_by_role(&state, UserRole::Student).await
}

async fn list_faculty(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    list_by_role(&state, UserRole::Faculty).await
}

async fn list_by_role(
    state: &AppState,
    role: UserRole,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state
        .users
        .list_by_role(role)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn create_student(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    create_user_with_role(&state, request, UserRole::Student).await
}

async fn create_faculty(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    create_user_with_role(&state, request, UserRole::Faculty).await
}

async fn create_user_with_role(
    state: &AppState,
    request: CreateUserRequest,
    role: UserRole,
) -> Result<Json<UserResponse>, ApiError> {
    let existing = state
        .users
        .find_by_email(&request.email)
        .await
        .map_err(ApiError::Internal)?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = state
        .users
        .create(NewUserRecord {
            email: request.email,
            username: request.username,
            full_name: request.full_name,
            password: hash_password(&request.password),
            role,
            is_active: true,
        })
        .await
        .map_err(ApiError::Internal)?;
    state.users.persist().await.map_err(ApiError::Internal)?;

    info!(email = %user.email, role = role.as_str(), "user created");
    Ok(Json(user.into()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get(user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let current = auth::current_user(&state, &headers).await?;
    auth::require_admin(&current, "delete users")?;

    let target = state
        .users
        .get(user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id == current.id {
        return Err(ApiError::Conflict(
            "Cannot delete your own account".to_string(),
        ));
    }

    state
        .users
        .delete(target.id)
        .await
        .map_err(ApiError::Internal)?;

    info!(user_id = target.id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

/// Seeds the configured admin account; also runs at startup so a fresh
/// deployment always has one.
async fn create_admin(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserResponse>, ApiError> {
    let auth_config = &state.config.auth;

    let existing = state
        .users
        .find_by_email(&auth_config.admin_email)
        .await
        .map_err(ApiError::Internal)?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Admin user already exists".to_string()));
    }

    let admin = state
        .users
        .create(NewUserRecord {
            email: auth_config.admin_email.clone(),
            username: auth_config.admin_username.clone(),
            full_name: auth_config.admin_full_name.clone(),
            password: hash_password(&auth_config.admin_password),
            role: UserRole::Admin,
            is_active: true,
        })
        .await
        .map_err(ApiError::Internal)?;
    state.users.persist().await.map_err(ApiError::Internal)?;

    info!(email = %admin.email, "admin user created");
    Ok(Json(admin.into()))
}
