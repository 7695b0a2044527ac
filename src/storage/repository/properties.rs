// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Property listing repository.
//!
//! ## Referential Actions
//!
//! - `owner_id` must reference an existing user
//! - deleting a property deletes its rental agreements
//! - deleting a property clears `property_id` on linked transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::constraints::{
    ensure, is_positive_amount, CheckResult, ConstraintViolation,
};
use super::super::database::{
    all_rows, children, claim_unique, get_row, link_key, put_row, swap_unique, Database,
    StorageError, StorageResult, Tables, PROPERTIES, PROPERTIES_BY_OWNER,
};
use super::{agreements, transactions, users};

const TABLE: &str = "properties";

/// Listing availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Rented,
    Pending,
}

/// Stored property listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Listing price (> 0)
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    /// Floor area (> 0)
    pub area: f64,
    #[serde(default)]
    pub amenities: serde_json::Value,
    #[serde(default)]
    pub images: serde_json::Value,
    #[serde(default)]
    pub address: serde_json::Value,
    /// On-chain listing identifier (unique)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,
    pub status: PropertyStatus,
    /// Owning user (FK, cascade)
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Create a new available listing owned by `owner_id`.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        price: f64,
        bedrooms: u32,
        bathrooms: u32,
        area: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            price,
            bedrooms,
            bathrooms,
            area,
            amenities: serde_json::Value::Array(Vec::new()),
            images: serde_json::Value::Array(Vec::new()),
            address: serde_json::Value::Object(serde_json::Map::new()),
            blockchain_id: None,
            metadata_uri: None,
            status: PropertyStatus::Available,
            owner_id: owner_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Row-level check constraints.
    pub fn validate(&self) -> CheckResult {
        ensure(!self.title.trim().is_empty(), TABLE, "ck_properties_title_not_empty")?;
        ensure(is_positive_amount(self.price), TABLE, "ck_properties_price_positive")?;
        ensure(self.bedrooms > 0, TABLE, "ck_properties_bedrooms_positive")?;
        ensure(self.bathrooms > 0, TABLE, "ck_properties_bathrooms_positive")?;
        ensure(is_positive_amount(self.area), TABLE, "ck_properties_area_positive")?;
        if let Some(blockchain_id) = &self.blockchain_id {
            ensure(!blockchain_id.is_empty(), TABLE, "ck_properties_blockchain_id_not_empty")?;
        }
        if let Some(uri) = &self.metadata_uri {
            ensure(url::Url::parse(uri).is_ok(), TABLE, "ck_properties_metadata_uri_format")?;
        }
        Ok(())
    }
}

/// Optional filters for [`PropertyRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub owner_id: Option<String>,
    pub status: Option<PropertyStatus>,
}

// =============================================================================
// Write-side helpers (shared with cascades)
// =============================================================================

pub(crate) fn exists(tables: &Tables<'_>, property_id: &str) -> StorageResult<bool> {
    Ok(get_row::<Property, _>(&tables.properties, property_id)?.is_some())
}

/// Delete a property, its agreements, and unlink its transactions.
pub(crate) fn remove(tables: &mut Tables<'_>, property_id: &str) -> StorageResult<Property> {
    let property: Property = get_row(&tables.properties, property_id)?
        .ok_or_else(|| StorageError::NotFound(format!("Property {property_id}")))?;

    for agreement_id in children(&tables.agreements_by_property, property_id)? {
        agreements::remove(tables, &agreement_id)?;
    }
    for transaction_id in children(&tables.transactions_by_property, property_id)? {
        transactions::detach_property(tables, &transaction_id)?;
    }

    tables
        .properties_by_owner
        .remove(link_key(&property.owner_id, property_id).as_str())?;
    if let Some(blockchain_id) = &property.blockchain_id {
        tables.properties_blockchain_id.remove(blockchain_id.as_str())?;
    }
    tables.properties.remove(property_id)?;
    Ok(property)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for property listings.
pub struct PropertyRepository<'a> {
    db: &'a Database,
}

impl<'a> PropertyRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new listing.
    pub fn create(&self, property: &Property) -> StorageResult<()> {
        property.validate()?;
        self.db.write(|t| {
            if exists(t, &property.id)? {
                return Err(ConstraintViolation::unique(TABLE, "id").into());
            }
            if !users::exists(t, &property.owner_id)? {
                return Err(ConstraintViolation::foreign_key(TABLE, "owner_id").into());
            }
            if let Some(blockchain_id) = &property.blockchain_id {
                claim_unique(
                    &mut t.properties_blockchain_id,
                    blockchain_id,
                    &property.id,
                    ConstraintViolation::unique(TABLE, "blockchain_id"),
                )?;
            }
            t.properties_by_owner.insert(
                link_key(&property.owner_id, &property.id).as_str(),
                property.id.as_str(),
            )?;
            put_row(&mut t.properties, &property.id, property)
        })
    }

    /// Get a listing by ID.
    pub fn get(&self, property_id: &str) -> StorageResult<Property> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(PROPERTIES)?;
        get_row(&table, property_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Property {property_id}")))
    }

    /// List listings, newest first.
    pub fn list(&self, filter: &PropertyFilter) -> StorageResult<Vec<Property>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(PROPERTIES)?;

        let mut properties: Vec<Property> = match &filter.owner_id {
            Some(owner_id) => {
                let index = read_txn.open_table(PROPERTIES_BY_OWNER)?;
                let mut rows = Vec::new();
                for id in children(&index, owner_id)? {
                    if let Some(property) = get_row(&table, &id)? {
                        rows.push(property);
                    }
                }
                rows
            }
            None => all_rows(&table)?,
        };

        if let Some(status) = filter.status {
            properties.retain(|p| p.status == status);
        }
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    /// Replace an existing listing.
    pub fn update(&self, property: &Property) -> StorageResult<()> {
        property.validate()?;
        self.db.write(|t| {
            let existing: Property = get_row(&t.properties, &property.id)?
                .ok_or_else(|| StorageError::NotFound(format!("Property {}", property.id)))?;

            if existing.owner_id != property.owner_id {
                if !users::exists(t, &property.owner_id)? {
                    return Err(ConstraintViolation::foreign_key(TABLE, "owner_id").into());
                }
                t.properties_by_owner
                    .remove(link_key(&existing.owner_id, &property.id).as_str())?;
                t.properties_by_owner.insert(
                    link_key(&property.owner_id, &property.id).as_str(),
                    property.id.as_str(),
                )?;
            }
            swap_unique(
                &mut t.properties_blockchain_id,
                existing.blockchain_id.as_deref(),
                property.blockchain_id.as_deref(),
                &property.id,
                ConstraintViolation::unique(TABLE, "blockchain_id"),
            )?;

            let mut updated = property.clone();
            updated.created_at = existing.created_at;
            updated.updated_at = Utc::now();
            put_row(&mut t.properties, &updated.id, &updated)
        })
    }

    /// Delete a listing with its agreements; linked transactions survive unlinked.
    pub fn delete(&self, property_id: &str) -> StorageResult<()> {
        self.db.write(|t| remove(t, property_id).map(|_| ()))
    }
}
