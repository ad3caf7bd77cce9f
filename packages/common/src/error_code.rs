//! Machine-readable reasons stored on submissions that end in `SystemError`.

pub const NO_TEST_CASES: &str = "NO_TEST_CASES";
pub const INVALID_LIMITS: &str = "INVALID_LIMITS";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const DISPATCH_FAILED: &str = "DISPATCH_FAILED";
pub const BACKEND_TIMEOUT: &str = "BACKEND_TIMEOUT";
pub const WORKER_PROCESSING_FAILED: &str = "WORKER_PROCESSING_FAILED";
pub const MALFORMED_TASK: &str = "MALFORMED_TASK";
pub const ENQUEUE_FAILED: &str = "ENQUEUE_FAILED";
pub const ABORTED: &str = "ABORTED";
