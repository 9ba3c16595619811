//! Common test constants used across multiple test files.

/// Project name written into every test project
pub const TEST_PROJECT: &str = "shop";

/// Default stage used in tests
pub const TEST_STAGE: &str = "dev";

/// Regions in the order a fan-out visits them
pub const TEST_REGIONS: [&str; 3] = ["ap-south-1", "eu-west-1", "us-east-1"];

/// Role recorded for every test region
pub const TEST_ROLE_ARN: &str = "arn:test:role:lambda";

/// Default timeout for test commands (in seconds)
pub const TEST_COMMAND_TIMEOUT_SECS: u64 = 30;
