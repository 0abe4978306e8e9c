/// Form validation for the auth and profile screens
///
/// Pure predicates, re-evaluated from the current field values every time a
/// form changes. Nothing here is cached.

use crate::error::ValidationError;

/// Default minimum password length
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Email looks plausible: contains '@' and '.'
pub fn is_email_valid(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// Password is at least `min_length` characters
pub fn is_password_valid(password: &str, min_length: usize) -> bool {
    password.chars().count() >= min_length
}

/// New password matches its confirmation and differs from the current one
pub fn is_confirmation_valid(current: &str, new: &str, confirmation: &str) -> bool {
    !new.is_empty() && new == confirmation && new != current
}

/// Optional strength hints shown under the password field.
/// These never block submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordHints {
    pub min_length: bool,
    pub upper_case: bool,
    pub lower_case: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordHints {
    pub fn of(password: &str, min_length: usize) -> Self {
        Self {
            min_length: is_password_valid(password, min_length),
            upper_case: password.chars().any(char::is_uppercase),
            lower_case: password.chars().any(char::is_lowercase),
            digit: password.chars().any(|c| c.is_ascii_digit()),
            special: password.chars().any(|c| !c.is_alphanumeric()),
        }
    }
}

/// Sign-in form: email shape and password length
pub fn check_sign_in(email: &str, password: &str, min_length: usize) -> Result<(), ValidationError> {
    if !is_email_valid(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    if !is_password_valid(password, min_length) {
        return Err(ValidationError::PasswordTooShort { min: min_length });
    }
    Ok(())
}

/// Sign-up form: as sign-in, plus the confirmation must match
pub fn check_sign_up(
    email: &str,
    password: &str,
    confirmation: &str,
    min_length: usize,
) -> Result<(), ValidationError> {
    check_sign_in(email, password, min_length)?;
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Change-email form: new address shape and current password length
pub fn check_change_email(
    new_email: &str,
    current_password: &str,
    min_length: usize,
) -> Result<(), ValidationError> {
    check_sign_in(new_email, current_password, min_length)
}

/// Change-password form. Checks run in the order the screen reports them.
pub fn check_change_password(
    current: &str,
    new: &str,
    confirmation: &str,
    min_length: usize,
) -> Result<(), ValidationError> {
    if current.trim().is_empty() {
        return Err(ValidationError::CurrentPasswordMissing);
    }
    if new.trim().is_empty() {
        return Err(ValidationError::NewPasswordMissing);
    }
    if confirmation.trim().is_empty() {
        return Err(ValidationError::ConfirmationMissing);
    }
    if new != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if new == current {
        return Err(ValidationError::PasswordUnchanged);
    }
    if !is_password_valid(new, min_length) {
        return Err(ValidationError::PasswordTooShort { min: min_length });
    }
    Ok(())
}
