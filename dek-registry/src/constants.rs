/// Creation timestamp stamped on every DEK the mock registers.
pub const MOCK_TS: i64 = 11_112_223_334;

/// Version sentinel that resolves to the highest registered DEK version.
pub const LATEST_VERSION: i32 = -1;

/// Version used when the caller has no specific DEK version in mind.
pub const DEFAULT_DEK_VERSION: i32 = 1;

pub const NOT_FOUND_STATUS: u16 = 404;
pub const NOT_FOUND_ERROR_CODE: u32 = 40400;
