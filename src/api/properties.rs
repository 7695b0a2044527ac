// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Property listing endpoints.
//!
//! Listings are public to read. Landlords and admins publish them; only the
//! owner (or an admin) may change or remove one.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AuthError, CurrentUser, Role},
    error::ApiError,
    models::{CreatePropertyRequest, DeletedResponse, PropertyQuery, UpdatePropertyRequest},
    state::AppState,
    storage::{OwnershipCheck, Property, PropertyFilter, PropertyRepository},
};

pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<PropertyQuery>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let filter = PropertyFilter {
        owner_id: query.owner_id,
        status: query.status,
    };
    Ok(Json(PropertyRepository::new(&state.db).list(&filter)?))
}

pub async fn create_property(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    if !caller.role.can_list_properties() {
        return Err(AuthError::InsufficientPermissions.into());
    }

    let owner_id = match request.owner_id {
        Some(owner_id) if owner_id != caller.id => {
            if !caller.role.has_privilege(Role::Admin) {
                return Err(AuthError::InsufficientPermissions.into());
            }
            owner_id
        }
        _ => caller.id.clone(),
    };

    let mut property = Property::new(
        owner_id,
        request.title,
        request.price,
        request.bedrooms,
        request.bathrooms,
        request.area,
    );
    property.description = request.description;
    if let Some(amenities) = request.amenities {
        property.amenities = amenities;
    }
    if let Some(images) = request.images {
        property.images = images;
    }
    if let Some(address) = request.address {
        property.address = address;
    }
    property.blockchain_id = request.blockchain_id;
    property.metadata_uri = request.metadata_uri;
    property.status = request.status.unwrap_or_default();

    PropertyRepository::new(&state.db).create(&property)?;

    tracing::info!(property_id = %property.id, owner_id = %property.owner_id, "Property listed");
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(PropertyRepository::new(&state.db).get(&property_id)?))
}

pub async fn update_property(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<Json<Property>, ApiError> {
    let repo = PropertyRepository::new(&state.db);
    let mut property = repo.get(&property_id).verify_owner(&caller)?;

    if let Some(title) = request.title {
        property.title = title;
    }
    if let Some(description) = request.description {
        property.description = Some(description);
    }
    if let Some(price) = request.price {
        property.price = price;
    }
    if let Some(bedrooms) = request.bedrooms {
        property.bedrooms = bedrooms;
    }
    if let Some(bathrooms) = request.bathrooms {
        property.bathrooms = bathrooms;
    }
    if let Some(area) = request.area {
        property.area = area;
    }
    if let Some(amenities) = request.amenities {
        property.amenities = amenities;
    }
    if let Some(images) = request.images {
        property.images = images;
    }
    if let Some(address) = request.address {
        property.address = address;
    }
    if let Some(blockchain_id) = request.blockchain_id {
        property.blockchain_id = Some(blockchain_id);
    }
    if let Some(metadata_uri) = request.metadata_uri {
        property.metadata_uri = Some(metadata_uri);
    }
    if let Some(status) = request.status {
        property.status = status;
    }

    repo.update(&property)?;
    Ok(Json(repo.get(&property_id)?))
}

/// Delete a listing; its agreements go with it and transactions are detached.
pub async fn delete_property(
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let repo = PropertyRepository::new(&state.db);
    repo.get(&property_id).verify_owner(&caller)?;
    repo.delete(&property_id)?;

    tracing::info!(property_id = %property_id, by = %caller.id, "Property deleted");
    Ok(Json(DeletedResponse::new("Property", property_id)))
}
