use chrono::Duration;
use tubely_api::auth::jwt::issue_token;
use uuid::Uuid;

/// Signing secret used by the test app (must match `create_test_config`).
pub const TEST_JWT_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: Uuid) -> String {
    let token = issue_token(user_id, TEST_JWT_SECRET, Duration::hours(1))
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}

pub fn expired_bearer(user_id: Uuid) -> String {
    let token = issue_token(user_id, TEST_JWT_SECRET, Duration::hours(-1))
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}
