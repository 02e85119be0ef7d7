//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dao::models::FeatureEntity;

/// Catalog row exposed to administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeatureRow {
    pub name: String,
    pub category: String,
}

impl From<FeatureEntity> for FeatureRow {
    fn from(feature: FeatureEntity) -> Self {
        Self {
            name: feature.name,
            category: feature.category,
        }
    }
}

/// Payload to create or update a catalog feature.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FeatureInput {
    pub name: String,
    pub category: String,
}

impl Validate for FeatureInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("name", &self.name), ("category", &self.category)] {
            if value.trim().is_empty() {
                let mut err = ValidationError::new("field_blank");
                err.message = Some(format!("{field} must not be blank").into());
                errors.add(field, err);
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<FeatureInput> for FeatureEntity {
    fn from(input: FeatureInput) -> Self {
        Self {
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
        }
    }
}

/// Acknowledgement for a catalog deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFeatureResponse {
    pub deleted: bool,
}
