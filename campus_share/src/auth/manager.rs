//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult, TokenError},
    models::{
        AuthSession, IdentityKeys, LoginRequest, NewUser, ProfileUpdate, RegisterRequest,
        TokenClaims, TokenIdentity, User, UserId,
    },
    tokens::TokenService,
};
use crate::db::{StoreError, UserRepository};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

/// Minimum accepted password length (characters).
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    pepper: String,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Credential store
    /// * `tokens` - Token service holding the signing secret
    /// * `pepper` - Server-side pepper appended before hashing (may be empty)
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService, pepper: String) -> Self {
        Self {
            users,
            tokens,
            pepper,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user and issue a token for it
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingFields` - email, username, password, student_id or phone absent
    /// * `AuthError::WeakPassword` - Password shorter than six characters
    /// * `AuthError::AlreadyExists` - Any of the four unique fields is taken
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthSession> {
        let email = present(request.email).map(|e| e.to_lowercase());
        let username = present(request.username);
        let password = request.password.filter(|p| !p.is_empty());
        let student_id = present(request.student_id);
        let phone = present(request.phone);

        let (Some(email), Some(username), Some(password), Some(student_id), Some(phone)) =
            (email, username, password, student_id, phone)
        else {
            return Err(AuthError::MissingFields(
                "Please provide email, username, password, student_id and phone".to_string(),
            ));
        };

        validate_password(&password)?;

        let keys = IdentityKeys {
            email: Some(email.clone()),
            username: Some(username.clone()),
            student_id: Some(student_id.clone()),
            phone: Some(phone.clone()),
        };

        if let Some(existing) = self.users.find_conflict(&keys, None).await? {
            return Err(AuthError::AlreadyExists(conflicting_field(&existing, &keys)));
        }

        let is_hosteller = request.is_hosteller.unwrap_or(false);
        let new_user = NewUser {
            email,
            username,
            password_hash: self.hash_password(&password)?,
            full_name: present(request.full_name),
            student_id,
            phone,
            is_hosteller,
            hostel: if is_hosteller { present(request.hostel) } else { None },
            degree: present(request.degree),
            branch: present(request.branch),
            department: present(request.department),
            year: request.year,
            consent_for_contact: request.consent_for_contact.unwrap_or(false),
        };

        // A concurrent registration can still win the race between the check
        // and the insert; the unique indexes surface that as a conflict.
        let user = self.users.create_user(new_user).await.map_err(|e| match e {
            StoreError::Conflict(field) => AuthError::AlreadyExists(format!("{field} already registered")),
            other => AuthError::Store(other),
        })?;

        log::info!("Registered user {} ({})", user.username, user.id);

        let token = self.tokens.issue(&TokenIdentity::from(&user))?;
        Ok(AuthSession { token, user })
    }

    /// Login with an identifier (email, username, student ID or phone) and password
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingFields` - Identifier or password absent
    /// * `AuthError::InvalidCredentials` - Unknown identifier or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthSession> {
        let identifier = present(request.email);
        let password = request.password.filter(|p| !p.is_empty());

        let (Some(identifier), Some(password)) = (identifier, password) else {
            return Err(AuthError::MissingFields(
                "Please provide identifier and password".to_string(),
            ));
        };

        let credentials = self
            .users
            .find_by_identifier(&identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(&password, &credentials.password_hash)?;

        let user = credentials.user;
        let token = self.tokens.issue(&TokenIdentity::from(&user))?;
        Ok(AuthSession { token, user })
    }

    /// Fetch the caller's profile
    pub async fn profile(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply a partial profile update
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - Token refers to a user that no longer exists
    /// * `AuthError::AlreadyExists` - New phone or student ID belongs to another user
    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> AuthResult<User> {
        let mut user = self.profile(user_id).await?;

        if let Some(department) = update.department {
            user.department = non_blank(department);
        }
        if let Some(year) = update.year {
            user.year = Some(year);
        }
        if let Some(full_name) = update.full_name {
            user.full_name = non_blank(full_name);
        }
        if let Some(degree) = update.degree {
            user.degree = non_blank(degree);
        }
        if let Some(branch) = update.branch {
            user.branch = non_blank(branch);
        }
        if let Some(consent) = update.consent_for_contact {
            user.consent_for_contact = consent;
        }

        let mut keys = IdentityKeys::default();
        if let Some(phone) = update.phone.and_then(non_blank) {
            if phone != user.phone {
                keys.phone = Some(phone.clone());
                user.phone = phone;
            }
        }
        if let Some(student_id) = update.student_id.and_then(non_blank) {
            if student_id != user.student_id {
                keys.student_id = Some(student_id.clone());
                user.student_id = student_id;
            }
        }

        if let Some(is_hosteller) = update.is_hosteller {
            user.is_hosteller = is_hosteller;
        }
        if !user.is_hosteller {
            user.hostel = None;
        } else if let Some(hostel) = update.hostel {
            user.hostel = non_blank(hostel);
        }

        if keys.phone.is_some() || keys.student_id.is_some() {
            if let Some(existing) = self.users.find_conflict(&keys, Some(user_id)).await? {
                return Err(AuthError::AlreadyExists(conflicting_field(&existing, &keys)));
            }
        }

        self.users.update_user(&user).await.map_err(|e| match e {
            StoreError::Conflict(field) => AuthError::AlreadyExists(format!("{field} already registered")),
            other => AuthError::Store(other),
        })?;

        Ok(user)
    }

    /// Verify a bearer token
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.tokens.verify(token)
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

/// Validate password strength
fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn present(value: Option<String>) -> Option<String> {
    value.and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Name the first unique field `existing` collides on.
fn conflicting_field(existing: &User, keys: &IdentityKeys) -> String {
    let field = if keys.email.as_deref() == Some(existing.email.as_str()) {
        "email"
    } else if keys.username.as_deref() == Some(existing.username.as_str()) {
        "username"
    } else if keys.student_id.as_deref() == Some(existing.student_id.as_str()) {
        "student_id"
    } else {
        "phone"
    };
    format!("{field} already registered")
}
