// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User account endpoints.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth, AuthError, CurrentUser, Role},
    error::ApiError,
    models::{
        DeletedResponse, RegisterUserRequest, UpdateUserRequest, UserQuery, UserResponse,
        MIN_PASSWORD_LEN,
    },
    state::AppState,
    storage::{OwnershipEnforcer, User, UserRepository},
};

/// Hash a password into an argon2id PHC string.
fn hash_password(password: &str) -> Result<String, ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::unprocessable(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {e}")))
}

/// Register a new account. Admin accounts cannot self-register.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let role = request.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(
        &request.email,
        request.full_name,
        password_hash,
        role,
        request.wallet_address,
    );
    UserRepository::new(&state.db).create(&user)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List accounts (admin only), optionally by role.
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list(query.role)?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// The account behind the current session.
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

pub async fn get_user(
    Auth(_session): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db).get(&user_id)?;
    Ok(Json(user.into()))
}

/// Update an account. Callers may edit themselves; role and status flags are admin only.
pub async fn update_user(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let mut user = repo.get(&user_id)?;
    user.verify_ownership(&caller)?;

    let is_admin = caller.role.has_privilege(Role::Admin);
    let touches_privileged = request.role.is_some_and(|r| r != user.role)
        || request.is_active.is_some()
        || request.is_verified.is_some();
    if touches_privileged && !is_admin {
        return Err(AuthError::InsufficientPermissions.into());
    }

    if let Some(email) = request.email {
        user.email = email;
    }
    if let Some(full_name) = request.full_name {
        user.full_name = full_name;
    }
    if let Some(password) = request.password {
        user.password_hash = hash_password(&password)?;
    }
    if let Some(role) = request.role {
        user.role = role;
    }
    if let Some(wallet) = request.wallet_address {
        user.wallet_address = Some(wallet).filter(|w| !w.is_empty());
    }
    if let Some(is_active) = request.is_active {
        user.is_active = is_active;
    }
    if let Some(is_verified) = request.is_verified {
        user.is_verified = is_verified;
    }

    repo.update(&user)?;
    let updated = repo.get(&user_id)?;
    tracing::info!(user_id = %user_id, by = %caller.id, "User updated");
    Ok(Json(updated.into()))
}

/// Delete an account and everything it owns.
pub async fn delete_user(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let repo = UserRepository::new(&state.db);
    repo.get(&user_id)?.verify_ownership(&caller)?;
    repo.delete(&user_id)?;

    tracing::info!(user_id = %user_id, by = %caller.id, "User deleted");
    Ok(Json(DeletedResponse::new("User", user_id)))
}
