pub mod actions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use actions::{body_json, login_request, refresh_cookie_from, request_with_cookie};
#[allow(unused_imports)]
pub use mocks::FailingRefreshTokenRepository;
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder, TEST_SECRET};
