//! Integration tests for the authentication system.
//!
//! Tests registration, login by every identifier, token lifetime and
//! profile updates against the in-memory store.

use campus_share::auth::{
    AuthError, AuthManager, LoginRequest, ProfileUpdate, RegisterRequest, TokenError,
    TokenIdentity, TokenService,
};
use campus_share::db::Repositories;
use chrono::{Duration, Utc};

const SECRET: &str = "auth_integration_secret_with_32_chars";

fn setup_auth_manager(repos: &Repositories, pepper: &str) -> AuthManager {
    AuthManager::new(
        repos.users.clone(),
        TokenService::new(SECRET),
        pepper.to_string(),
    )
}

fn registration(name: &str) -> RegisterRequest {
    RegisterRequest {
        email: Some(format!("{name}@campus.edu")),
        username: Some(name.to_string()),
        password: Some("secret1".to_string()),
        student_id: Some(format!("22BCE{name}")),
        phone: Some(format!("98{name}")),
        ..Default::default()
    }
}

fn login(identifier: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(identifier.to_string()),
        password: Some(password.to_string()),
    }
}

#[tokio::test]
async fn test_register_and_login_flow() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "pepper");

    let session = auth.register(registration("asha")).await.unwrap();
    let claims = auth.verify_token(&session.token).unwrap();
    assert_eq!(claims.user_id, session.user.id);
    assert_eq!(claims.email, "asha@campus.edu");
    assert_eq!(claims.student_id, "22BCEasha");

    for identifier in ["asha@campus.edu", "asha", "22BCEasha", "98asha"] {
        let session = auth.login(login(identifier, "secret1")).await.unwrap();
        assert_eq!(session.user.username, "asha", "login via {identifier}");
    }
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_alike() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "");
    auth.register(registration("bala")).await.unwrap();

    let wrong = auth.login(login("bala", "nope123")).await.unwrap_err();
    let unknown = auth.login(login("ghost", "nope123")).await.unwrap_err();

    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_pepper_is_part_of_the_hash() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "first-pepper");
    auth.register(registration("chen")).await.unwrap();

    let other = setup_auth_manager(&repos, "second-pepper");
    let err = other.login(login("chen", "secret1")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    auth.login(login("chen", "secret1")).await.unwrap();
}

#[tokio::test]
async fn test_each_unique_field_conflicts() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "");
    auth.register(registration("dev")).await.unwrap();

    let mut same_phone = registration("eva");
    same_phone.phone = Some("98dev".to_string());
    let mut same_student = registration("eva");
    same_student.student_id = Some("22BCEdev".to_string());
    let mut same_email = registration("eva");
    same_email.email = Some("DEV@campus.edu".to_string());
    let mut same_username = registration("eva");
    same_username.username = Some("dev".to_string());

    for request in [same_phone, same_student, same_email, same_username] {
        let err = auth.register(request).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(_)), "{err}");
    }

    auth.register(registration("eva")).await.unwrap();
}

#[tokio::test]
async fn test_token_expires_after_seven_days() {
    let tokens = TokenService::new(SECRET);
    let identity = TokenIdentity {
        user_id: uuid::Uuid::new_v4(),
        email: "f@campus.edu".to_string(),
        username: "f".to_string(),
        student_id: "S-F".to_string(),
    };

    let issued = Utc::now();
    let token = tokens.issue_at(&identity, issued).unwrap();

    let claims = tokens
        .verify_at(&token, issued + Duration::days(7) - Duration::seconds(1))
        .unwrap();
    assert_eq!(claims.user_id, identity.user_id);

    let err = tokens
        .verify_at(&token, issued + Duration::days(7))
        .unwrap_err();
    assert_eq!(err, TokenError::Expired);
}

#[tokio::test]
async fn test_token_from_other_secret_is_invalid() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "");
    let session = auth.register(registration("gia")).await.unwrap();

    let foreign = TokenService::new("another_secret_that_is_long_enough!!");
    assert_eq!(
        foreign.verify(&session.token).unwrap_err(),
        TokenError::Invalid
    );
    assert_eq!(auth.verify_token("garbage").unwrap_err(), TokenError::Invalid);
}

#[tokio::test]
async fn test_profile_update_is_partial() {
    let repos = Repositories::in_memory();
    let auth = setup_auth_manager(&repos, "");
    let session = auth.register(registration("hari")).await.unwrap();
    auth.register(registration("isha")).await.unwrap();

    let user = auth
        .update_profile(
            session.user.id,
            ProfileUpdate {
                department: Some("SCOPE".to_string()),
                is_hosteller: Some(true),
                hostel: Some("Men's Block Q".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(user.department.as_deref(), Some("SCOPE"));
    assert_eq!(user.hostel.as_deref(), Some("Men's Block Q"));
    assert_eq!(user.phone, "98hari");

    let err = auth
        .update_profile(
            session.user.id,
            ProfileUpdate {
                student_id: Some("22BCEisha".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyExists(_)));

    // Keeping one's own phone is not a conflict.
    auth.update_profile(
        session.user.id,
        ProfileUpdate {
            phone: Some("98hari".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let user = auth
        .update_profile(
            session.user.id,
            ProfileUpdate {
                is_hosteller: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(user.hostel.is_none());

    let stored = auth.profile(session.user.id).await.unwrap();
    assert_eq!(stored, user);
}
