//! Manifest artifact validation
//!
//! Generate jobs produce CycloneDX documents. Before a document is persisted
//! it must pass the structural checks below; anything else fails the request
//! with ERR_GENERATION.

use thiserror::Error;

/// Validation errors for generated manifest documents
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not a JSON object")]
    NotAnObject,

    #[error("manifest is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported BOM format: {0}")]
    UnsupportedFormat(String),

    #[error("manifest field `{0}` has the wrong shape")]
    WrongShape(&'static str),
}

/// Structural validation of a CycloneDX document
pub fn validate_bom(bom: &serde_json::Value) -> Result<(), ManifestError> {
    let object = bom.as_object().ok_or(ManifestError::NotAnObject)?;

    let format = object
        .get("bomFormat")
        .and_then(|value| value.as_str())
        .ok_or(ManifestError::MissingField("bomFormat"))?;
    if format != "CycloneDX" {
        return Err(ManifestError::UnsupportedFormat(format.to_string()));
    }

    let spec_version = object
        .get("specVersion")
        .and_then(|value| value.as_str())
        .ok_or(ManifestError::MissingField("specVersion"))?;
    if spec_version.is_empty() {
        return Err(ManifestError::WrongShape("specVersion"));
    }

    if let Some(components) = object.get("components") {
        if !components.is_array() {
            return Err(ManifestError::WrongShape("components"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bom() -> serde_json::Value {
        serde_json::json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.6",
            "components": [
                { "type": "library", "name": "quarkus-core", "version": "3.8.4" }
            ]
        })
    }

    #[test]
    fn test_accepts_valid_bom() {
        assert!(validate_bom(&valid_bom()).is_ok());
    }

    #[test]
    fn test_accepts_bom_without_components() {
        let bom = serde_json::json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.6",
        });
        assert!(validate_bom(&bom).is_ok());
    }

    #[test]
    fn test_rejects_non_object() {
        assert_eq!(
            validate_bom(&serde_json::json!("not a bom")),
            Err(ManifestError::NotAnObject)
        );
    }

    #[test]
    fn test_rejects_missing_format() {
        let bom = serde_json::json!({ "specVersion": "1.6" });
        assert_eq!(
            validate_bom(&bom),
            Err(ManifestError::MissingField("bomFormat"))
        );
    }

    #[test]
    fn test_rejects_foreign_format() {
        let bom = serde_json::json!({
            "bomFormat": "SPDX",
            "specVersion": "2.3",
        });
        assert_eq!(
            validate_bom(&bom),
            Err(ManifestError::UnsupportedFormat("SPDX".to_string()))
        );
    }

    #[test]
    fn test_rejects_malformed_components() {
        let mut bom = valid_bom();
        bom["components"] = serde_json::json!("none");
        assert_eq!(
            validate_bom(&bom),
            Err(ManifestError::WrongShape("components"))
        );
    }
}
