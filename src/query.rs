//! Input validation: turns a raw user string into a normalized [`Query`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// The kind of lookup a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Phone,
    Vehicle,
    Ip,
    BankCode,
    FreeText,
    Image,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Phone => "phone",
            Category::Vehicle => "vehicle",
            Category::Ip => "ip",
            Category::BankCode => "bank_code",
            Category::FreeText => "free_text",
            Category::Image => "image",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is not a 10-12 digit phone number (an optional +91 prefix is allowed)")]
    BadPhoneShape(String),

    #[error("'{0}' is not a vehicle registration number (e.g. MH12AB1234)")]
    BadVehicleShape(String),

    #[error("'{0}' is not an IPv4 address (e.g. 1.1.1.1)")]
    BadIpShape(String),

    #[error("'{0}' is not an IFSC code (e.g. HDFC0000001)")]
    BadBankCodeShape(String),

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("image file is empty")]
    EmptyImage,

    #[error("image queries need file bytes, not text")]
    ImageRequiresBytes,
}

impl ValidationError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::BadPhoneShape(_) => "bad_phone_shape",
            ValidationError::BadVehicleShape(_) => "bad_vehicle_shape",
            ValidationError::BadIpShape(_) => "bad_ip_shape",
            ValidationError::BadBankCodeShape(_) => "bad_bank_code_shape",
            ValidationError::EmptyQuery => "empty_query",
            ValidationError::EmptyImage => "empty_image",
            ValidationError::ImageRequiresBytes => "image_requires_bytes",
        }
    }
}

/// A validated lookup. `normalized` always satisfies the category's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub category: Category,
    pub raw: String,
    pub normalized: String,
    /// Raw file bytes; only set for [`Category::Image`].
    pub image: Option<Arc<[u8]>>,
}

impl Query {
    fn text(category: Category, raw: &str, normalized: String) -> Self {
        Self {
            category,
            raw: raw.to_string(),
            normalized,
            image: None,
        }
    }
}

pub fn validate(raw: &str, category: Category) -> Result<Query, ValidationError> {
    let trimmed = raw.trim();
    match category {
        Category::Phone => {
            let cleaned = clean_phone(trimmed);
            if !(10..=12).contains(&cleaned.len()) || !cleaned.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(ValidationError::BadPhoneShape(raw.to_string()));
            }
            Ok(Query::text(category, raw, cleaned))
        }
        Category::Vehicle => {
            let plate = trimmed.to_ascii_uppercase();
            if !is_vehicle_plate(&plate) {
                return Err(ValidationError::BadVehicleShape(raw.to_string()));
            }
            Ok(Query::text(category, raw, plate))
        }
        Category::Ip => {
            if !is_ipv4_shape(trimmed) {
                return Err(ValidationError::BadIpShape(raw.to_string()));
            }
            Ok(Query::text(category, raw, trimmed.to_string()))
        }
        Category::BankCode => {
            let code = trimmed.to_ascii_uppercase();
            if !is_ifsc(&code) {
                return Err(ValidationError::BadBankCodeShape(raw.to_string()));
            }
            Ok(Query::text(category, raw, code))
        }
        Category::FreeText => {
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyQuery);
            }
            Ok(Query::text(category, raw, trimmed.to_string()))
        }
        Category::Image => Err(ValidationError::ImageRequiresBytes),
    }
}

/// Build an image query. `name` is only used for display.
pub fn validate_image(name: &str, bytes: Vec<u8>) -> Result<Query, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyImage);
    }
    let name = name.trim();
    let name = if name.is_empty() { "image" } else { name };
    Ok(Query {
        category: Category::Image,
        raw: name.to_string(),
        normalized: name.to_string(),
        image: Some(Arc::from(bytes)),
    })
}

/// Strip a leading `+91`, then every whitespace character and hyphen.
fn clean_phone(s: &str) -> String {
    s.strip_prefix("+91")
        .unwrap_or(s)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Indian registration plate: 2 letters, 1-2 digits, 0-2 letters, 4 digits.
fn is_vehicle_plate(s: &str) -> bool {
    let runs = char_runs(s);
    match runs.as_slice() {
        [(true, 2), (false, d)] => (5..=6).contains(d),
        [(true, 2), (false, d1), (true, l), (false, 4)] => (1..=2).contains(d1) && *l <= 2,
        _ => false,
    }
}

/// Split an ASCII-alphanumeric string into (is_letter, len) runs.
/// Any other character yields an empty result so the caller rejects it.
fn char_runs(s: &str) -> Vec<(bool, usize)> {
    let mut runs: Vec<(bool, usize)> = Vec::new();
    for b in s.bytes() {
        let letter = if b.is_ascii_uppercase() {
            true
        } else if b.is_ascii_digit() {
            false
        } else {
            return Vec::new();
        };
        match runs.last_mut() {
            Some((kind, len)) if *kind == letter => *len += 1,
            _ => runs.push((letter, 1)),
        }
    }
    runs
}

/// Four dot-separated groups of 1-3 digits. Octet values are not range-checked.
fn is_ipv4_shape(s: &str) -> bool {
    let groups: Vec<&str> = s.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

/// IFSC: 4 letters, a literal `0`, then 6 letters or digits.
fn is_ifsc(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 11
        && b[..4].iter().all(u8::is_ascii_uppercase)
        && b[4] == b'0'
        && b[5..]
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_strips_prefix_spaces_and_hyphens() {
        let q = validate("+91 98765-43210", Category::Phone).unwrap();
        assert_eq!(q.normalized, "9876543210");
        assert_eq!(q.raw, "+91 98765-43210");
    }

    #[test]
    fn phone_accepts_twelve_digits() {
        let q = validate("919876543210", Category::Phone).unwrap();
        assert_eq!(q.normalized, "919876543210");
    }

    #[test]
    fn phone_rejects_short_and_non_digit() {
        for raw in ["12345", "98765abcde", "+1 555 123 4567 890", ""] {
            let err = validate(raw, Category::Phone).unwrap_err();
            assert_eq!(err.reason(), "bad_phone_shape", "input: {raw:?}");
        }
    }

    #[test]
    fn vehicle_accepts_common_plates() {
        for raw in ["MH12AB1234", "mh12ab1234", "DL1C1234", "KA011234", "TN9Z0001", "UP321234"] {
            assert!(validate(raw, Category::Vehicle).is_ok(), "should accept {raw}");
        }
        let q = validate(" mh12ab1234 ", Category::Vehicle).unwrap();
        assert_eq!(q.normalized, "MH12AB1234");
    }

    #[test]
    fn vehicle_rejects_malformed_plates() {
        for raw in ["MH1234", "M12AB1234", "MH123AB1234", "MH12ABC1234", "MH12AB123", "MH-12-AB-1234"] {
            let err = validate(raw, Category::Vehicle).unwrap_err();
            assert_eq!(err.reason(), "bad_vehicle_shape", "input: {raw}");
        }
    }

    #[test]
    fn ip_checks_shape_only() {
        assert!(validate("1.1.1.1", Category::Ip).is_ok());
        assert!(validate("999.999.999.999", Category::Ip).is_ok());
        for raw in ["1.1.1", "1.1.1.1.1", "1.1.1.1234", "a.b.c.d", "1..1.1"] {
            assert_eq!(
                validate(raw, Category::Ip).unwrap_err().reason(),
                "bad_ip_shape",
                "input: {raw}"
            );
        }
    }

    #[test]
    fn bank_code_uppercases_and_checks_shape() {
        let q = validate("hdfc0000001", Category::BankCode).unwrap();
        assert_eq!(q.normalized, "HDFC0000001");
        assert!(validate("SBIN0ABC123", Category::BankCode).is_ok());
        for raw in ["HDFC1000001", "HDF00000001", "HDFC000001", "HDFC0-00001"] {
            assert_eq!(
                validate(raw, Category::BankCode).unwrap_err().reason(),
                "bad_bank_code_shape"
            );
        }
    }

    #[test]
    fn free_text_rejects_blank() {
        assert_eq!(
            validate("   ", Category::FreeText).unwrap_err(),
            ValidationError::EmptyQuery
        );
        let q = validate("  someone@example.com ", Category::FreeText).unwrap();
        assert_eq!(q.normalized, "someone@example.com");
    }

    #[test]
    fn image_needs_bytes() {
        assert_eq!(
            validate("photo.jpg", Category::Image).unwrap_err().reason(),
            "image_requires_bytes"
        );
        assert_eq!(
            validate_image("photo.jpg", Vec::new()).unwrap_err(),
            ValidationError::EmptyImage
        );
        let q = validate_image("photo.jpg", vec![1, 2, 3]).unwrap();
        assert_eq!(q.category, Category::Image);
        assert_eq!(q.image.as_deref(), Some(&[1u8, 2, 3][..]));
    }
}
