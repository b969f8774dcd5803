//! Field validation primitives
//!
//! Validators never panic on malformed input: every outcome is reported
//! through the returned `Result`, with the field label embedded in the
//! error so messages can be shown to users as-is.

use crate::config::UploadConfig;
use crate::ingest::{RawRow, ValidRow};
use thiserror::Error;
use uuid::Uuid;

/// A single field that failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// Require a non-empty string; the returned value is trimmed
pub fn non_empty_string(value: Option<&str>, field: &str) -> FieldResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(FieldError::new(field, "must not be empty")),
        None => Err(FieldError::new(field, "is required")),
    }
}

/// Require an integer >= 1
pub fn positive_integer(value: Option<&str>, field: &str) -> FieldResult<i64> {
    let raw = required(value, field)?;
    let parsed: i64 = raw
        .parse()
        .map_err(|_| FieldError::new(field, "must be a positive integer"))?;
    if parsed < 1 {
        return Err(FieldError::new(field, "must be a positive integer"));
    }
    Ok(parsed)
}

/// Require a finite number >= 0
pub fn non_negative_number(value: Option<&str>, field: &str) -> FieldResult<f64> {
    let raw = required(value, field)?;
    let parsed: f64 = raw
        .parse()
        .map_err(|_| FieldError::new(field, "must be a non-negative number"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(FieldError::new(field, "must be a non-negative number"));
    }
    Ok(parsed)
}

/// Require a well-formed UUID
pub fn uuid(value: Option<&str>, field: &str) -> FieldResult<Uuid> {
    let raw = required(value, field)?;
    Uuid::parse_str(raw).map_err(|_| FieldError::new(field, "must be a valid UUID"))
}

/// Optional free text: absent and blank values both become `None`
pub fn optional_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required<'a>(value: Option<&'a str>, field: &str) -> FieldResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FieldError::new(field, "is required")),
    }
}

/// Check an uploaded file against the configured type and size limits.
///
/// A missing or generic content type falls back to a guess from the file name.
pub fn upload_file(
    file_name: Option<&str>,
    content_type: Option<&str>,
    size: usize,
    rules: &UploadConfig,
) -> FieldResult<()> {
    let name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| FieldError::new("file", "is required"))?;

    if size == 0 {
        return Err(FieldError::new("file", "must not be empty"));
    }
    if size > rules.max_bytes {
        return Err(FieldError::new(
            "file",
            format!("exceeds the maximum size of {} bytes", rules.max_bytes),
        ));
    }

    let extension = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    if !rules
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    {
        return Err(FieldError::new(
            "file",
            format!("must have one of the extensions: {}", rules.allowed_extensions.join(", ")),
        ));
    }

    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
    if !rules.allowed_mime_types.iter().any(|allowed| *allowed == mime) {
        return Err(FieldError::new(
            "file",
            format!("has unsupported content type '{}'", mime),
        ));
    }

    Ok(())
}

/// Validate every field of a raw CSV row.
///
/// All failing fields are reported together, in column order, so the
/// message is stable for a given row.
pub fn inventory_row(row: &RawRow) -> std::result::Result<ValidRow, String> {
    let store_name = non_empty_string(row.store_name.as_deref(), "store_name");
    let store_address = non_empty_string(row.store_address.as_deref(), "store_address");
    let book_name = non_empty_string(row.book_name.as_deref(), "book_name");
    let pages = positive_integer(row.pages.as_deref(), "pages");
    let author_name = non_empty_string(row.author_name.as_deref(), "author_name");
    let price = non_negative_number(row.price.as_deref(), "price");
    let logo = optional_string(row.logo.as_deref());

    match (store_name, store_address, book_name, pages, author_name, price) {
        (Ok(store_name), Ok(store_address), Ok(book_name), Ok(pages), Ok(author_name), Ok(price)) => {
            Ok(ValidRow {
                store_name,
                store_address,
                book_name,
                pages,
                author_name,
                price,
                logo,
            })
        }
        (store_name, store_address, book_name, pages, author_name, price) => {
            let errors: Vec<String> = [
                store_name.err(),
                store_address.err(),
                book_name.err(),
                pages.err(),
                author_name.err(),
                price.err(),
            ]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect();
            Err(errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_rules() -> UploadConfig {
        UploadConfig::default()
    }

    fn raw_row(pages: &str) -> RawRow {
        RawRow {
            store_name: Some("Corner Books".to_string()),
            store_address: Some("1 Main St".to_string()),
            book_name: Some("Dune".to_string()),
            pages: Some(pages.to_string()),
            author_name: Some("Frank Herbert".to_string()),
            price: Some("9.99".to_string()),
            logo: None,
        }
    }

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string(Some("  Dune "), "book_name").unwrap(), "Dune");
        assert_eq!(
            non_empty_string(Some("   "), "book_name").unwrap_err().to_string(),
            "book_name must not be empty"
        );
        assert_eq!(
            non_empty_string(None, "book_name").unwrap_err().to_string(),
            "book_name is required"
        );
    }

    #[test]
    fn test_positive_integer() {
        assert_eq!(positive_integer(Some("412"), "pages").unwrap(), 412);
        assert!(positive_integer(Some("0"), "pages").is_err());
        assert!(positive_integer(Some("-1"), "pages").is_err());
        assert!(positive_integer(Some("12abc"), "pages").is_err());
        assert!(positive_integer(Some("1.5"), "pages").is_err());
        assert!(positive_integer(None, "pages").is_err());
    }

    #[test]
    fn test_non_negative_number() {
        assert_eq!(non_negative_number(Some("0"), "price").unwrap(), 0.0);
        assert_eq!(non_negative_number(Some(" 12.50 "), "price").unwrap(), 12.5);
        assert!(non_negative_number(Some("-0.01"), "price").is_err());
        assert!(non_negative_number(Some("free"), "price").is_err());
        assert!(non_negative_number(Some("NaN"), "price").is_err());
        assert!(non_negative_number(Some("inf"), "price").is_err());
    }

    #[test]
    fn test_uuid() {
        let id = Uuid::new_v4().to_string();
        assert!(uuid(Some(&id), "storeId").is_ok());
        assert_eq!(
            uuid(Some("not-a-uuid"), "storeId").unwrap_err().to_string(),
            "storeId must be a valid UUID"
        );
    }

    #[test]
    fn test_optional_string() {
        assert_eq!(optional_string(Some("  ")), None);
        assert_eq!(optional_string(None), None);
        assert_eq!(
            optional_string(Some(" https://x/logo.png ")),
            Some("https://x/logo.png".to_string())
        );
    }

    #[test]
    fn test_upload_file_accepts_csv() {
        let rules = upload_rules();
        assert!(upload_file(Some("stock.csv"), Some("text/csv"), 10, &rules).is_ok());
        assert!(upload_file(Some("stock.CSV"), Some("text/plain; charset=utf-8"), 10, &rules).is_ok());
        assert!(upload_file(Some("stock.csv"), Some("application/vnd.ms-excel"), 10, &rules).is_ok());
        assert!(upload_file(Some("stock.csv"), None, 10, &rules).is_ok());
    }

    #[test]
    fn test_upload_file_rejections() {
        let rules = upload_rules();
        assert!(upload_file(Some("stock.json"), Some("text/csv"), 10, &rules).is_err());
        assert!(upload_file(Some("stock.csv"), Some("application/pdf"), 10, &rules).is_err());
        assert!(upload_file(Some("stock.csv"), Some("text/csv"), 0, &rules).is_err());
        assert!(upload_file(None, Some("text/csv"), 10, &rules).is_err());

        let too_big = rules.max_bytes + 1;
        let err = upload_file(Some("stock.csv"), Some("text/csv"), too_big, &rules).unwrap_err();
        assert!(err.to_string().contains("maximum size"));
    }

    #[test]
    fn test_inventory_row_reports_pages() {
        let err = inventory_row(&raw_row("-1")).unwrap_err();
        assert!(err.contains("pages"));
    }

    #[test]
    fn test_inventory_row_is_deterministic() {
        let mut row = raw_row("abc");
        row.price = Some("-3".to_string());
        row.store_name = None;

        let first = inventory_row(&row).unwrap_err();
        let second = inventory_row(&row).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "store_name is required; pages must be a positive integer; price must be a non-negative number"
        );
    }

    #[test]
    fn test_inventory_row_valid() {
        let mut row = raw_row("412");
        row.logo = Some("  ".to_string());
        let valid = inventory_row(&row).unwrap();
        assert_eq!(valid.pages, 412);
        assert_eq!(valid.price, 9.99);
        assert_eq!(valid.logo, None);
    }
}
