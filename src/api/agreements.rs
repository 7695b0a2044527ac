// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rental agreement endpoints.
//!
//! An agreement is visible to its tenant, the landlord owning the property,
//! and admins. The same parties may update or delete it.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AuthError, CurrentUser, Role},
    error::ApiError,
    models::{AgreementQuery, CreateAgreementRequest, DeletedResponse, UpdateAgreementRequest},
    state::AppState,
    storage::{
        AgreementFilter, AgreementRepository, ConstraintViolation, PropertyFilter,
        PropertyRepository, RentalAgreement, StorageError, StorageResult, User,
    },
};

fn is_admin(user: &User) -> bool {
    user.role.has_privilege(Role::Admin)
}

/// Whether `caller` owns the property `property_id` refers to.
fn owns_property(state: &AppState, caller: &User, property_id: &str) -> StorageResult<bool> {
    match PropertyRepository::new(&state.db).get(property_id) {
        Ok(property) => Ok(property.owner_id == caller.id),
        Err(StorageError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn ensure_party(state: &AppState, caller: &User, agreement: &RentalAgreement) -> Result<(), ApiError> {
    if is_admin(caller)
        || agreement.tenant_id == caller.id
        || owns_property(state, caller, &agreement.property_id)?
    {
        Ok(())
    } else {
        Err(StorageError::PermissionDenied {
            user_id: caller.id.clone(),
            resource: "rental agreement".to_string(),
        }
        .into())
    }
}

pub async fn list_agreements(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<AgreementQuery>,
) -> Result<Json<Vec<RentalAgreement>>, ApiError> {
    let filter = AgreementFilter {
        property_id: query.property_id,
        tenant_id: query.tenant_id,
    };
    let mut agreements = AgreementRepository::new(&state.db).list(&filter)?;

    if !is_admin(&caller) {
        let owned: HashSet<String> = PropertyRepository::new(&state.db)
            .list(&PropertyFilter {
                owner_id: Some(caller.id.clone()),
                status: None,
            })?
            .into_iter()
            .map(|p| p.id)
            .collect();
        agreements.retain(|a| a.tenant_id == caller.id || owned.contains(&a.property_id));
    }

    Ok(Json(agreements))
}

pub async fn create_agreement(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateAgreementRequest>,
) -> Result<(StatusCode, Json<RentalAgreement>), ApiError> {
    let tenant_id = request.tenant_id.unwrap_or_else(|| caller.id.clone());

    // Signing on someone else's behalf is reserved to the landlord and admins
    if tenant_id != caller.id && !is_admin(&caller) {
        match PropertyRepository::new(&state.db).get(&request.property_id) {
            Ok(property) if property.owner_id == caller.id => {}
            Ok(_) => return Err(AuthError::InsufficientPermissions.into()),
            Err(StorageError::NotFound(_)) => {
                return Err(ConstraintViolation::foreign_key("rental_agreements", "property_id").into())
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut agreement = RentalAgreement::new(
        request.property_id,
        tenant_id,
        request.start_date,
        request.end_date,
        request.monthly_rent,
        request.security_deposit,
    );
    agreement.agreement_hash = request.agreement_hash;
    agreement.blockchain_id = request.blockchain_id;
    if let Some(metadata) = request.metadata {
        agreement.metadata = metadata;
    }

    AgreementRepository::new(&state.db).create(&agreement)?;

    tracing::info!(
        agreement_id = %agreement.id,
        property_id = %agreement.property_id,
        tenant_id = %agreement.tenant_id,
        "Rental agreement created"
    );
    Ok((StatusCode::CREATED, Json(agreement)))
}

pub async fn get_agreement(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
) -> Result<Json<RentalAgreement>, ApiError> {
    let agreement = AgreementRepository::new(&state.db).get(&agreement_id)?;
    ensure_party(&state, &caller, &agreement)?;
    Ok(Json(agreement))
}

/// Update status, document hash or on-chain id.
pub async fn update_agreement(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    Json(request): Json<UpdateAgreementRequest>,
) -> Result<Json<RentalAgreement>, ApiError> {
    let repo = AgreementRepository::new(&state.db);
    let mut agreement = repo.get(&agreement_id)?;
    ensure_party(&state, &caller, &agreement)?;

    if let Some(status) = request.status {
        agreement.status = status;
    }
    if let Some(hash) = request.agreement_hash {
        agreement.agreement_hash = Some(hash);
    }
    if let Some(blockchain_id) = request.blockchain_id {
        agreement.blockchain_id = Some(blockchain_id);
    }

    repo.update(&agreement)?;
    Ok(Json(repo.get(&agreement_id)?))
}

pub async fn delete_agreement(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let repo = AgreementRepository::new(&state.db);
    let agreement = repo.get(&agreement_id)?;
    ensure_party(&state, &caller, &agreement)?;
    repo.delete(&agreement_id)?;

    tracing::info!(agreement_id = %agreement_id, by = %caller.id, "Rental agreement deleted");
    Ok(Json(DeletedResponse::new("Rental agreement", agreement_id)))
}
