// Session issuance/verification against the public crate surface.

use chrono::Duration;

use daybook_api::session::{AuthError, SessionClaims, SessionService};

#[test]
fn issue_then_verify_round_trips_the_uid() {
    let sessions = SessionService::new("integration-secret", Duration::hours(2)).unwrap();
    let token = sessions.issue(SessionClaims { uid: 31 }).unwrap();
    assert_eq!(sessions.verify(&token).unwrap(), 31);
}

#[test]
fn the_token_is_opaque_but_not_secret_free() {
    let sessions = SessionService::new("integration-secret", Duration::hours(2)).unwrap();
    let token = sessions.issue(SessionClaims { uid: 31 }).unwrap();
    // three dot-separated segments, none containing the signing key
    assert_eq!(token.split('.').count(), 3);
    assert!(!token.contains("integration-secret"));
}

#[test]
fn verification_failures_are_distinguished() {
    let sessions = SessionService::new("integration-secret", Duration::seconds(-1)).unwrap();
    let expired = sessions.issue(SessionClaims { uid: 1 }).unwrap();
    assert!(matches!(sessions.verify(&expired), Err(AuthError::Expired)));
    assert!(matches!(sessions.verify(""), Err(AuthError::Invalid)));
}
