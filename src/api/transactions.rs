// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction record endpoints and chain confirmation sync.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    blockchain::ChainError,
    error::ApiError,
    models::{
        CreateTransactionRequest, DeletedResponse, TransactionQuery, UpdateTransactionRequest,
    },
    state::AppState,
    storage::{OwnershipCheck, Transaction, TransactionFilter, TransactionRepository},
};

/// The caller's own transactions, newest first.
pub async fn list_transactions(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let filter = TransactionFilter {
        user_id: Some(caller.id),
        property_id: query.property_id,
    };
    Ok(Json(TransactionRepository::new(&state.db).list(&filter)?))
}

pub async fn create_transaction(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let mut tx = Transaction::new(&caller.id);
    tx.property_id = request.property_id;
    tx.kind = request.kind.unwrap_or_default();
    tx.amount = request.amount;
    tx.hash = request.hash;
    tx.from_address = request.from_address;
    tx.to_address = request.to_address;
    if let Some(metadata) = request.metadata {
        tx.metadata = metadata;
    }

    TransactionRepository::new(&state.db).create(&tx)?;

    tracing::info!(transaction_id = %tx.id, user_id = %tx.user_id, kind = ?tx.kind, "Transaction recorded");
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn get_transaction(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = TransactionRepository::new(&state.db)
        .get(&transaction_id)
        .verify_owner(&caller)?;
    Ok(Json(tx))
}

pub async fn update_transaction(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let repo = TransactionRepository::new(&state.db);
    let mut tx = repo.get(&transaction_id).verify_owner(&caller)?;

    if let Some(property_id) = request.property_id {
        tx.property_id = Some(property_id).filter(|p| !p.is_empty());
    }
    if let Some(kind) = request.kind {
        tx.kind = kind;
    }
    if let Some(amount) = request.amount {
        tx.amount = Some(amount);
    }
    if let Some(status) = request.status {
        tx.status = status;
    }
    if let Some(hash) = request.hash {
        tx.hash = Some(hash);
    }
    if let Some(from) = request.from_address {
        tx.from_address = Some(from);
    }
    if let Some(to) = request.to_address {
        tx.to_address = Some(to);
    }
    if let Some(confirmations) = request.confirmations {
        tx.confirmations = Some(confirmations);
    }
    if let Some(metadata) = request.metadata {
        tx.metadata = metadata;
    }

    repo.update(&tx)?;
    Ok(Json(repo.get(&transaction_id)?))
}

pub async fn delete_transaction(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let repo = TransactionRepository::new(&state.db);
    repo.get(&transaction_id).verify_owner(&caller)?;
    repo.delete(&transaction_id)?;
    Ok(Json(DeletedResponse::new("Transaction", transaction_id)))
}

/// Refresh status and confirmations from the chain.
///
/// Unmined transactions are returned unchanged; reverted ones are marked failed.
pub async fn sync_transaction(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let Some(chain) = state.chain.clone() else {
        return Err(ApiError::service_unavailable("Chain sync is not configured"));
    };

    let repo = TransactionRepository::new(&state.db);
    let tx = repo.get(&transaction_id).verify_owner(&caller)?;
    let Some(hash) = tx.hash.clone() else {
        return Err(ApiError::unprocessable("Transaction has no hash to look up"));
    };

    let confirmation = chain.confirmations(&hash).await.map_err(|e| match e {
        ChainError::InvalidHash(msg) => ApiError::unprocessable(msg),
        other => {
            tracing::warn!(transaction_id = %transaction_id, error = %other, "Chain lookup failed");
            ApiError::bad_gateway("Chain lookup failed")
        }
    })?;

    let Some(confirmation) = confirmation else {
        tracing::debug!(transaction_id = %transaction_id, "Transaction not yet mined");
        return Ok(Json(tx));
    };

    let synced = repo.record_chain_result(
        &transaction_id,
        confirmation.block_number,
        confirmation.confirmations,
        confirmation.success,
    )?;

    tracing::info!(
        transaction_id = %transaction_id,
        status = ?synced.status,
        confirmations = confirmation.confirmations,
        "Transaction synced from chain"
    );
    Ok(Json(synced))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::api::test_support::{body_json, request, seed_user, session_token, test_app};
    use crate::auth::Role;
    use crate::blockchain::ChainClient;
    use crate::storage::{Property, PropertyRepository};

    const HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

    #[tokio::test]
    async fn list_returns_only_callers_transactions() {
        let (app, state, _dir) = test_app();
        let alice = seed_user(&state, "alice@example.com", Role::Tenant);
        let bob = seed_user(&state, "bob@example.com", Role::Tenant);
        let repo = TransactionRepository::new(&state.db);
        repo.create(&Transaction::new(&alice.id)).unwrap();
        repo.create(&Transaction::new(&bob.id)).unwrap();

        let token = session_token(&state, "alice@example.com");
        let response = app
            .oneshot(request(Method::GET, "/v1/transactions", Some(&token), None))
            .await
            .unwrap();
        let list = body_json(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["user_id"], alice.id.as_str());
    }

    #[tokio::test]
    async fn create_validates_hash_and_property() {
        let (app, state, _dir) = test_app();
        let landlord = seed_user(&state, "landlord@example.com", Role::Landlord);
        seed_user(&state, "alice@example.com", Role::Tenant);
        let property = Property::new(&landlord.id, "Studio", 700.0, 1, 1, 30.0);
        PropertyRepository::new(&state.db).create(&property).unwrap();
        let token = session_token(&state, "alice@example.com");

        let body = json!({"property_id": property.id, "kind": "rent", "amount": 700.0, "hash": HASH});
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/v1/transactions", Some(&token), Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["kind"], "rent");
        assert_eq!(created["status"], "pending");

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/v1/transactions", Some(&token), Some(json!({"hash": "0x1234"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error_code"], "check_violation");

        let response = app
            .oneshot(request(Method::POST, "/v1/transactions", Some(&token), Some(json!({"property_id": "gone"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error_code"], "foreign_key_violation");
    }

    #[tokio::test]
    async fn other_users_transactions_are_forbidden() {
        let (app, state, _dir) = test_app();
        let alice = seed_user(&state, "alice@example.com", Role::Tenant);
        seed_user(&state, "bob@example.com", Role::Tenant);
        let tx = Transaction::new(&alice.id);
        TransactionRepository::new(&state.db).create(&tx).unwrap();
        let path = format!("/v1/transactions/{}", tx.id);

        let bob = session_token(&state, "bob@example.com");
        for method in [Method::GET, Method::DELETE] {
            let response = app
                .clone()
                .oneshot(request(method, &path, Some(&bob), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        let alice_token = session_token(&state, "alice@example.com");
        let response = app
            .oneshot(request(Method::PATCH, &path, Some(&alice_token), Some(json!({"confirmations": -1}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sync_without_rpc_is_unavailable() {
        let (app, state, _dir) = test_app();
        let alice = seed_user(&state, "alice@example.com", Role::Tenant);
        let mut tx = Transaction::new(&alice.id);
        tx.hash = Some(HASH.to_string());
        TransactionRepository::new(&state.db).create(&tx).unwrap();

        let token = session_token(&state, "alice@example.com");
        let response = app
            .oneshot(request(Method::POST, &format!("/v1/transactions/{}/sync", tx.id), Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn sync_requires_hash_and_reports_rpc_failure() {
        let (_app, state, _dir) = test_app();
        let state = state.with_chain(ChainClient::new("http://127.0.0.1:1").unwrap());
        let app = router(state.clone());

        let alice = seed_user(&state, "alice@example.com", Role::Tenant);
        let token = session_token(&state, "alice@example.com");
        let repo = TransactionRepository::new(&state.db);

        let unhashed = Transaction::new(&alice.id);
        repo.create(&unhashed).unwrap();
        let response = app
            .clone()
            .oneshot(request(Method::POST, &format!("/v1/transactions/{}/sync", unhashed.id), Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let mut hashed = Transaction::new(&alice.id);
        hashed.hash = Some(HASH.to_string());
        repo.create(&hashed).unwrap();
        let response = app
            .oneshot(request(Method::POST, &format!("/v1/transactions/{}/sync", hashed.id), Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(repo.get(&hashed.id).unwrap().status, crate::storage::TxStatus::Pending);
    }
}
