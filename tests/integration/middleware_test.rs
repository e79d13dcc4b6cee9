use commit_app::middleware::UserIdentity;
use commit_app::services::JWTService;
use std::sync::Arc;
use uuid::Uuid;

use crate::support::test_config;

#[test]
fn test_user_identity_struct() {
    let user_id = Uuid::new_v4();
    let identity = UserIdentity { user_id };

    assert_eq!(identity.clone().user_id, user_id);
}

#[test]
fn test_token_subject_round_trip() {
    let jwt = JWTService::new(Arc::new(test_config().auth));
    let user_id = Uuid::new_v4();

    let token = jwt.generate_token(user_id).unwrap();
    let claims = jwt.validate_token(&token).unwrap();

    assert_eq!(JWTService::user_id_from_claims(&claims).unwrap(), user_id);
}

#[test]
fn test_token_from_other_secret_is_rejected() {
    let mut other = test_config().auth;
    other.jwt_secret = "another-secret-key-with-minimum-32-characters".to_string();
    let token = JWTService::new(Arc::new(other))
        .generate_token(Uuid::new_v4())
        .unwrap();

    let jwt = JWTService::new(Arc::new(test_config().auth));
    assert!(jwt.validate_token(&token).is_err());
}
