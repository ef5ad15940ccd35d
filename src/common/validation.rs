use rust_decimal::Decimal;
use validator::ValidationError;

// ---
// Validações customizadas reaproveitadas pelos payloads
// ---
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_are_rejected() {
        assert!(validate_not_negative(&Decimal::from(-1)).is_err());
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
        assert!(validate_not_negative(&Decimal::from(10)).is_ok());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("Loa JBL").is_ok());
    }
}
