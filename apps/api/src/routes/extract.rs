use axum::{
    extract::multipart::MultipartError,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::storage::content_type_for;

/// `?id=` query used by the update and delete endpoints.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// Missing id is a 400; an id that is not a UUID cannot exist, so it is a 404.
    pub fn record_id(&self, not_found: &str) -> Result<Uuid, AppError> {
        let raw = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("No ID provided"))?;
        Uuid::parse_str(raw).map_err(|_| AppError::not_found(not_found))
    }
}

pub fn multipart_error(e: MultipartError) -> AppError {
    AppError::validation(format!("Invalid multipart body: {e}"))
}

/// Serves an archived upload as a download.
pub fn attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\', '\r', '\n'], "")
    );
    (
        [
            (header::CONTENT_TYPE, content_type_for(file_name).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(id: Option<&str>) -> IdQuery {
        IdQuery {
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_id_is_validation_error() {
        let err = query(None).record_id("Candidate not found").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "No ID provided"));
        let err = query(Some("  ")).record_id("Candidate not found").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        let err = query(Some("abc")).record_id("Candidate not found").unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Candidate not found"));
    }

    #[test]
    fn test_valid_id() {
        let id = Uuid::new_v4();
        assert_eq!(query(Some(&id.to_string())).record_id("x").unwrap(), id);
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment("cv \"final\".pdf", b"%PDF".to_vec());
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv final.pdf\""
        );
    }
}
