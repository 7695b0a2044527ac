// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rental agreement repository.
//!
//! An agreement binds a property to a tenant for a date range. It is removed
//! when either the property or the tenant is deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::super::constraints::{
    ensure, is_non_negative_amount, is_positive_amount, CheckResult, ConstraintViolation,
};
use super::super::database::{
    all_rows, children, claim_unique, get_row, link_key, put_row, swap_unique, Database,
    StorageError, StorageResult, Tables, AGREEMENTS, AGREEMENTS_BY_PROPERTY,
    AGREEMENTS_BY_TENANT,
};
use super::{properties, users};

const TABLE: &str = "rental_agreements";

/// Agreement lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgreementStatus {
    /// Drafted, not yet signed by both parties
    #[default]
    Pending,
    /// Signed and in force
    Active,
    /// Ran to its end date
    Completed,
    /// Ended early
    Terminated,
}

/// Stored rental agreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RentalAgreement {
    pub id: String,
    /// Rented property (FK, cascade)
    pub property_id: String,
    /// Tenant user (FK, cascade)
    pub tenant_id: String,
    pub start_date: NaiveDate,
    /// Must be strictly after `start_date`
    pub end_date: NaiveDate,
    pub status: AgreementStatus,
    pub monthly_rent: f64,
    pub security_deposit: f64,
    /// Hash of the signed agreement document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_hash: Option<String>,
    /// On-chain agreement identifier (unique)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalAgreement {
    /// Create a new pending agreement.
    pub fn new(
        property_id: impl Into<String>,
        tenant_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        monthly_rent: f64,
        security_deposit: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            property_id: property_id.into(),
            tenant_id: tenant_id.into(),
            start_date,
            end_date,
            status: AgreementStatus::Pending,
            monthly_rent,
            security_deposit,
            agreement_hash: None,
            blockchain_id: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Row-level check constraints.
    pub fn validate(&self) -> CheckResult {
        ensure(self.end_date > self.start_date, TABLE, "ck_rental_agreements_dates")?;
        ensure(
            is_positive_amount(self.monthly_rent),
            TABLE,
            "ck_rental_agreements_monthly_rent_positive",
        )?;
        ensure(
            is_non_negative_amount(self.security_deposit),
            TABLE,
            "ck_rental_agreements_security_deposit_non_negative",
        )?;
        if let Some(blockchain_id) = &self.blockchain_id {
            ensure(
                !blockchain_id.is_empty(),
                TABLE,
                "ck_rental_agreements_blockchain_id_not_empty",
            )?;
        }
        Ok(())
    }
}

/// Optional filters for [`AgreementRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct AgreementFilter {
    pub property_id: Option<String>,
    pub tenant_id: Option<String>,
}

// =============================================================================
// Write-side helpers (shared with cascades)
// =============================================================================

/// Delete one agreement and its index entries.
pub(crate) fn remove(tables: &mut Tables<'_>, agreement_id: &str) -> StorageResult<RentalAgreement> {
    let agreement: RentalAgreement = get_row(&tables.agreements, agreement_id)?
        .ok_or_else(|| StorageError::NotFound(format!("Rental agreement {agreement_id}")))?;

    tables
        .agreements_by_property
        .remove(link_key(&agreement.property_id, agreement_id).as_str())?;
    tables
        .agreements_by_tenant
        .remove(link_key(&agreement.tenant_id, agreement_id).as_str())?;
    if let Some(blockchain_id) = &agreement.blockchain_id {
        tables.agreements_blockchain_id.remove(blockchain_id.as_str())?;
    }
    tables.agreements.remove(agreement_id)?;
    Ok(agreement)
}

fn check_references(tables: &Tables<'_>, agreement: &RentalAgreement) -> StorageResult<()> {
    if !properties::exists(tables, &agreement.property_id)? {
        return Err(ConstraintViolation::foreign_key(TABLE, "property_id").into());
    }
    if !users::exists(tables, &agreement.tenant_id)? {
        return Err(ConstraintViolation::foreign_key(TABLE, "tenant_id").into());
    }
    Ok(())
}

fn link(tables: &mut Tables<'_>, agreement: &RentalAgreement) -> StorageResult<()> {
    tables.agreements_by_property.insert(
        link_key(&agreement.property_id, &agreement.id).as_str(),
        agreement.id.as_str(),
    )?;
    tables.agreements_by_tenant.insert(
        link_key(&agreement.tenant_id, &agreement.id).as_str(),
        agreement.id.as_str(),
    )?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for rental agreements.
pub struct AgreementRepository<'a> {
    db: &'a Database,
}

impl<'a> AgreementRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, agreement: &RentalAgreement) -> StorageResult<()> {
        agreement.validate()?;
        self.db.write(|t| {
            if get_row::<RentalAgreement, _>(&t.agreements, &agreement.id)?.is_some() {
                return Err(ConstraintViolation::unique(TABLE, "id").into());
            }
            check_references(t, agreement)?;
            if let Some(blockchain_id) = &agreement.blockchain_id {
                claim_unique(
                    &mut t.agreements_blockchain_id,
                    blockchain_id,
                    &agreement.id,
                    ConstraintViolation::unique(TABLE, "blockchain_id"),
                )?;
            }
            link(t, agreement)?;
            put_row(&mut t.agreements, &agreement.id, agreement)
        })
    }

    pub fn get(&self, agreement_id: &str) -> StorageResult<RentalAgreement> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AGREEMENTS)?;
        get_row(&table, agreement_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Rental agreement {agreement_id}")))
    }

    /// List agreements matching every given filter, newest first.
    pub fn list(&self, filter: &AgreementFilter) -> StorageResult<Vec<RentalAgreement>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AGREEMENTS)?;

        let mut agreements: Vec<RentalAgreement> = match (&filter.property_id, &filter.tenant_id) {
            (Some(property_id), _) => {
                let index = read_txn.open_table(AGREEMENTS_BY_PROPERTY)?;
                let mut rows = Vec::new();
                for id in children(&index, property_id)? {
                    if let Some(row) = get_row(&table, &id)? {
                        rows.push(row);
                    }
                }
                rows
            }
            (None, Some(tenant_id)) => {
                let index = read_txn.open_table(AGREEMENTS_BY_TENANT)?;
                let mut rows = Vec::new();
                for id in children(&index, tenant_id)? {
                    if let Some(row) = get_row(&table, &id)? {
                        rows.push(row);
                    }
                }
                rows
            }
            (None, None) => all_rows(&table)?,
        };

        if let Some(tenant_id) = &filter.tenant_id {
            agreements.retain(|a| &a.tenant_id == tenant_id);
        }
        agreements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agreements)
    }

    /// Replace an existing agreement.
    pub fn update(&self, agreement: &RentalAgreement) -> StorageResult<()> {
        agreement.validate()?;
        self.db.write(|t| {
            let existing: RentalAgreement = get_row(&t.agreements, &agreement.id)?
                .ok_or_else(|| {
                    StorageError::NotFound(format!("Rental agreement {}", agreement.id))
                })?;

            if existing.property_id != agreement.property_id
                || existing.tenant_id != agreement.tenant_id
            {
                check_references(t, agreement)?;
                t.agreements_by_property
                    .remove(link_key(&existing.property_id, &existing.id).as_str())?;
                t.agreements_by_tenant
                    .remove(link_key(&existing.tenant_id, &existing.id).as_str())?;
                link(t, agreement)?;
            }
            swap_unique(
                &mut t.agreements_blockchain_id,
                existing.blockchain_id.as_deref(),
                agreement.blockchain_id.as_deref(),
                &agreement.id,
                ConstraintViolation::unique(TABLE, "blockchain_id"),
            )?;

            let mut updated = agreement.clone();
            updated.created_at = existing.created_at;
            updated.updated_at = Utc::now();
            put_row(&mut t.agreements, &updated.id, &updated)
        })
    }

    pub fn delete(&self, agreement_id: &str) -> StorageResult<()> {
        self.db.write(|t| remove(t, agreement_id).map(|_| ()))
    }
}
