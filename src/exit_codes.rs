//! Exit code constants for the t4gen CLI.
//!
//! - 0: Every template generated successfully
//! - 1: At least one template reported errors
//! - 2: User error (bad args, invalid config)
//! - 3: The template processor could not be run (launch, timeout, crash)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// One or more templates failed with diagnostics.
pub const TEMPLATE_FAILURE: i32 = 1;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 2;

/// Processor failure: launch error, timeout, abnormal exit or unreadable output.
pub const PROCESSOR_FAILURE: i32 = 3;
