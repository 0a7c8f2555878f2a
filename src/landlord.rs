use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::contract::PropertyContract;
use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::types::{ContractId, LandlordId};

/// the entity that owns leased properties and receives rent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landlord {
    pub id: LandlordId,
    pub name: String,
    /// contact and banking details, opaque to the engine
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub contracts: Vec<PropertyContract>,
}

impl Landlord {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: LandlordId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RentalError::InvalidContract {
                message: "landlord name is empty".to_string(),
            });
        }
        Ok(Self {
            id,
            name,
            details: BTreeMap::new(),
            contracts: Vec::new(),
        })
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn contract(&self, contract_id: ContractId) -> Option<&PropertyContract> {
        self.contracts.iter().find(|c| c.id == contract_id)
    }

    pub fn contract_mut(&mut self, contract_id: ContractId) -> Option<&mut PropertyContract> {
        self.contracts.iter_mut().find(|c| c.id == contract_id)
    }

    pub fn active_contracts(&self) -> impl Iterator<Item = &PropertyContract> {
        self.contracts.iter().filter(|c| c.is_active())
    }

    /// sum of current periodic rent over active contracts, recomputed each call
    pub fn total_rental_amount(&self, as_of: NaiveDate) -> Result<Money> {
        self.active_contracts()
            .map(|c| c.current_amount(as_of))
            .sum()
    }
}
