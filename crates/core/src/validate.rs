//! Customer field validation and input sanitization.
//!
//! Rules and messages mirror the storefront checkout form exactly: the same
//! Italian strings surface in API error payloads and in the client UI, so
//! the wording is part of the wire contract.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::types::CustomerInfo;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^3\d{8,9}$").expect("Invalid regex"));

static CAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").expect("Invalid regex"));

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZàèéìòùÀÈÉÌÒÙ\s'\-]+$").expect("Invalid regex"));

/// Domain suffixes accepted for customer emails (store policy, stricter
/// than RFC).
const ALLOWED_EMAIL_SUFFIXES: [&str; 5] = [".it", ".com", ".eu", ".org", ".net"];

/// A failed field check: the camelCase field key plus the user-facing
/// Italian message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validate an email address.
///
/// # Errors
///
/// Returns the user-facing message when the address is empty, malformed, or
/// outside the accepted domain suffixes.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("L'email è obbligatoria".to_owned());
    }

    if !EMAIL_RE.is_match(email) {
        return Err("Email non valida".to_owned());
    }

    let lowered = email.to_lowercase();
    let has_valid_suffix = ALLOWED_EMAIL_SUFFIXES
        .iter()
        .any(|suffix| lowered.ends_with(suffix));
    if !has_valid_suffix {
        return Err("Email deve terminare con .it, .com, .eu, .org o .net".to_owned());
    }

    Ok(())
}

/// Validate an Italian mobile number.
///
/// Separators (spaces, hyphens, plus) are stripped, as is a leading `39`
/// country code when one is present on top of a full-length number, so
/// `+39 345-123-4567` normalizes to `3451234567`.
///
/// # Errors
///
/// Returns the user-facing message when the number is empty or does not
/// match the mobile pattern after normalization.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.trim().is_empty() {
        return Err("Il telefono è obbligatorio".to_owned());
    }

    if !PHONE_RE.is_match(&normalize_phone(phone)) {
        return Err("Telefono non valido (deve iniziare con 3 e avere 10-12 cifre)".to_owned());
    }

    Ok(())
}

fn normalize_phone(phone: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();

    // A 39 prefix beyond the 10-digit mobile length is the country code.
    if cleaned.len() > 10 {
        if let Some(rest) = cleaned.strip_prefix("39") {
            return rest.to_owned();
        }
    }
    cleaned
}

/// Validate an Italian postal code (CAP).
///
/// # Errors
///
/// Returns the user-facing message when the code is empty, not exactly five
/// digits, or outside the accepted numeric range.
pub fn validate_postal_code(postal_code: &str) -> Result<(), String> {
    if postal_code.trim().is_empty() {
        return Err("Il CAP è obbligatorio".to_owned());
    }

    if !CAP_RE.is_match(postal_code) {
        return Err("CAP non valido (deve essere 5 cifre)".to_owned());
    }

    // Range kept from the form rules; [0, 99999] admits every five-digit CAP.
    let in_range = postal_code
        .parse::<u32>()
        .is_ok_and(|num| num <= 99_999);
    if !in_range {
        return Err("CAP non valido".to_owned());
    }

    Ok(())
}

/// Validate a name field. `field_label` is the Italian label interpolated
/// into messages (`Nome`, `Cognome`).
///
/// # Errors
///
/// Returns the user-facing message when the name is empty, shorter than 2 or
/// longer than 50 characters, or contains anything besides letters, spaces,
/// hyphens, and apostrophes.
pub fn validate_name(name: &str, field_label: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{field_label} è obbligatorio"));
    }

    if trimmed.chars().count() < 2 {
        return Err(format!("{field_label} deve essere almeno 2 caratteri"));
    }

    if trimmed.chars().count() > 50 {
        return Err(format!("{field_label} non può superare 50 caratteri"));
    }

    if !NAME_RE.is_match(name) {
        return Err(format!("{field_label} può contenere solo lettere"));
    }

    Ok(())
}

/// Validate a street address.
///
/// # Errors
///
/// Returns the user-facing message when the address is empty or its trimmed
/// length falls outside `[5, 100]`.
pub fn validate_address(address: &str) -> Result<(), String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err("L'indirizzo è obbligatorio".to_owned());
    }

    if trimmed.chars().count() < 5 {
        return Err("L'indirizzo deve essere almeno 5 caratteri".to_owned());
    }

    if trimmed.chars().count() > 100 {
        return Err("L'indirizzo non può superare 100 caratteri".to_owned());
    }

    Ok(())
}

/// Validate a city name.
///
/// # Errors
///
/// Returns the user-facing message when the city is empty or shorter than
/// two characters.
pub fn validate_city(city: &str) -> Result<(), String> {
    let trimmed = city.trim();
    if trimmed.is_empty() {
        return Err("La città è obbligatoria".to_owned());
    }

    if trimmed.chars().count() < 2 {
        return Err("La città deve essere almeno 2 caratteri".to_owned());
    }

    Ok(())
}

/// Validate a country name.
///
/// # Errors
///
/// Returns the user-facing message when the country is empty.
pub fn validate_country(country: &str) -> Result<(), String> {
    if country.trim().is_empty() {
        return Err("Il paese è obbligatorio".to_owned());
    }

    Ok(())
}

/// Run every field validator over a customer and collect all failures.
///
/// Never short-circuits: a completely blank form reports one error per
/// field, in form order.
#[must_use]
pub fn validate_customer(customer: &CustomerInfo) -> Vec<FieldError> {
    let checks: [(&'static str, Result<(), String>); 8] = [
        ("firstName", validate_name(&customer.first_name, "Nome")),
        ("lastName", validate_name(&customer.last_name, "Cognome")),
        ("email", validate_email(&customer.email)),
        ("phone", validate_phone(&customer.phone)),
        ("address", validate_address(&customer.address)),
        ("city", validate_city(&customer.city)),
        ("postalCode", validate_postal_code(&customer.postal_code)),
        ("country", validate_country(&customer.country)),
    ];

    checks
        .into_iter()
        .filter_map(|(field, result)| {
            result.err().map(|message| FieldError { field, message })
        })
        .collect()
}

/// Escape HTML-significant characters.
///
/// Applied to customer text before validation and before interpolation into
/// email templates or AirTable columns. Idempotent: the replacement
/// entities contain none of the escaped characters.
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_accepts_store_domains() {
        for email in [
            "maria@example.it",
            "maria.rossi@example.com",
            "maria+saldi@example.eu",
            "m@example.org",
            "MARIA@EXAMPLE.NET",
        ] {
            assert_eq!(validate_email(email), Ok(()), "{email}");
        }
    }

    #[test]
    fn test_email_not_an_email() {
        assert_eq!(
            validate_email("not-an-email"),
            Err("Email non valida".to_owned())
        );
    }

    #[test]
    fn test_email_required() {
        assert_eq!(validate_email(""), Err("L'email è obbligatoria".to_owned()));
        assert_eq!(
            validate_email("   "),
            Err("L'email è obbligatoria".to_owned())
        );
    }

    #[test]
    fn test_email_rejects_foreign_suffix() {
        assert_eq!(
            validate_email("maria@example.dev"),
            Err("Email deve terminare con .it, .com, .eu, .org o .net".to_owned())
        );
    }

    #[test]
    fn test_phone_accepts_international_format() {
        // +39 with separators normalizes to the bare mobile number
        assert_eq!(validate_phone("+39 345-123-4567"), Ok(()));
        assert_eq!(validate_phone("345 123 4567"), Ok(()));
        assert_eq!(validate_phone("3451234567"), Ok(()));
        assert_eq!(validate_phone("345123456"), Ok(()));
    }

    #[test]
    fn test_phone_normalization_strips_country_code() {
        assert_eq!(normalize_phone("+39 345-123-4567"), "3451234567");
        // A bare 10-digit number starting with 39 is left alone
        assert_eq!(normalize_phone("3934567890"), "3934567890");
    }

    #[test]
    fn test_phone_rejects_landline_and_garbage() {
        let message = "Telefono non valido (deve iniziare con 3 e avere 10-12 cifre)".to_owned();
        assert_eq!(validate_phone("0612345678"), Err(message.clone()));
        assert_eq!(validate_phone("345"), Err(message.clone()));
        assert_eq!(validate_phone("34512345678"), Err(message));
        assert_eq!(
            validate_phone(""),
            Err("Il telefono è obbligatorio".to_owned())
        );
    }

    #[test]
    fn test_postal_code() {
        assert_eq!(validate_postal_code("00187"), Ok(()));
        assert_eq!(
            validate_postal_code(""),
            Err("Il CAP è obbligatorio".to_owned())
        );
        assert_eq!(
            validate_postal_code("0018"),
            Err("CAP non valido (deve essere 5 cifre)".to_owned())
        );
        assert_eq!(
            validate_postal_code("ABCDE"),
            Err("CAP non valido (deve essere 5 cifre)".to_owned())
        );
    }

    #[test]
    fn test_name_accepts_accents_and_compounds() {
        assert_eq!(validate_name("Niccolò", "Nome"), Ok(()));
        assert_eq!(validate_name("D'Angelo-Rossi", "Cognome"), Ok(()));
        assert_eq!(validate_name("Maria Grazia", "Nome"), Ok(()));
    }

    #[test]
    fn test_name_boundaries() {
        assert_eq!(
            validate_name("", "Nome"),
            Err("Nome è obbligatorio".to_owned())
        );
        assert_eq!(
            validate_name("M", "Nome"),
            Err("Nome deve essere almeno 2 caratteri".to_owned())
        );
        assert_eq!(
            validate_name(&"a".repeat(51), "Cognome"),
            Err("Cognome non può superare 50 caratteri".to_owned())
        );
        assert_eq!(
            validate_name("Maria123", "Nome"),
            Err("Nome può contenere solo lettere".to_owned())
        );
    }

    #[test]
    fn test_address_boundaries() {
        assert_eq!(validate_address("Via Condotti 12"), Ok(()));
        assert_eq!(
            validate_address(""),
            Err("L'indirizzo è obbligatorio".to_owned())
        );
        assert_eq!(
            validate_address("Via"),
            Err("L'indirizzo deve essere almeno 5 caratteri".to_owned())
        );
        assert_eq!(
            validate_address(&"v".repeat(101)),
            Err("L'indirizzo non può superare 100 caratteri".to_owned())
        );
    }

    #[test]
    fn test_city_and_country() {
        assert_eq!(validate_city("Roma"), Ok(()));
        assert_eq!(validate_city(""), Err("La città è obbligatoria".to_owned()));
        assert_eq!(
            validate_city("R"),
            Err("La città deve essere almeno 2 caratteri".to_owned())
        );
        assert_eq!(validate_country("Italia"), Ok(()));
        assert_eq!(
            validate_country(" "),
            Err("Il paese è obbligatorio".to_owned())
        );
    }

    #[test]
    fn test_sanitize_escapes_all_markup() {
        assert_eq!(
            sanitize_input(r#"<a href="/x">'hi'</a>"#),
            "&lt;a href=&quot;&#x2F;x&quot;&gt;&#x27;hi&#x27;&lt;&#x2F;a&gt;"
        );
        assert_eq!(sanitize_input(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_input("Via <Roma> \"centro\"");
        assert_eq!(sanitize_input(&once), once);
    }

    #[test]
    fn test_validation_verdict_stable_after_sanitizing() {
        // Already-sanitized input re-validates to the same verdict
        for name in ["Maria", "Maria <x>"] {
            let sanitized = sanitize_input(name);
            let first = validate_name(&sanitized, "Nome");
            let second = validate_name(&sanitize_input(&sanitized), "Nome");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_aggregate_collects_every_failure() {
        let blank = CustomerInfo {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: String::new(),
            notes: None,
        };
        let errors = validate_customer(&blank);
        assert_eq!(errors.len(), 8);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            [
                "firstName",
                "lastName",
                "email",
                "phone",
                "address",
                "city",
                "postalCode",
                "country"
            ]
        );
    }

    #[test]
    fn test_aggregate_passes_complete_customer() {
        let customer = CustomerInfo {
            first_name: "Maria".to_owned(),
            last_name: "Rossi".to_owned(),
            email: "maria.rossi@example.it".to_owned(),
            phone: "+39 345 123 4567".to_owned(),
            address: "Via Condotti 12".to_owned(),
            city: "Roma".to_owned(),
            postal_code: "00187".to_owned(),
            country: "Italia".to_owned(),
            notes: Some("citofono Rossi".to_owned()),
        };
        assert!(validate_customer(&customer).is_empty());
    }
}
