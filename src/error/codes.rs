/// Error code registry for tabflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Source errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Schema errors
/// - 5000-5999: Data errors
/// - 6000-6999: Stage errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_FEATURE_OVERLAP: u16 = 1010;

    // Source errors (2000-2999)
    pub const SOURCE_UNAVAILABLE: u16 = 2000;
    pub const SOURCE_TIMEOUT: u16 = 2001;
    pub const SOURCE_BAD_RESPONSE: u16 = 2002;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;
    pub const STORAGE_CORRUPTED: u16 = 3006;
    pub const STORAGE_SERIALIZATION_ERROR: u16 = 3011;

    // Schema errors (4000-4999)
    pub const SCHEMA_PARSE: u16 = 4000;
    pub const SCHEMA_INVALID_COLUMNS: u16 = 4001;

    // Data errors (5000-5999)
    pub const DATA_INVALID: u16 = 5000;
    pub const DATA_MISSING_TARGET: u16 = 5001;
    pub const DATA_NON_NUMERIC: u16 = 5002;
    pub const DATA_TOO_SMALL: u16 = 5003;
    pub const DATA_SHAPE_MISMATCH: u16 = 5004;

    // Stage errors (6000-6999)
    pub const STAGE_VALIDATION_FAILED: u16 = 6000;
    pub const STAGE_TASK_FAILED: u16 = 6001;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "Generic configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_INVALID_YAML => "Invalid YAML in configuration",
        ErrorCode::CONFIG_MISSING_REQUIRED => "Required configuration value missing",
        ErrorCode::CONFIG_INVALID_VALUE => "Configuration value out of range",
        ErrorCode::CONFIG_FEATURE_OVERLAP => "Column listed in more than one scaling group",

        ErrorCode::SOURCE_UNAVAILABLE => "Document store unreachable",
        ErrorCode::SOURCE_TIMEOUT => "Document store request timed out",
        ErrorCode::SOURCE_BAD_RESPONSE => "Document store returned an unexpected payload",

        ErrorCode::STORAGE_GENERIC => "Generic storage error",
        ErrorCode::STORAGE_IO_ERROR => "Filesystem I/O error",
        ErrorCode::STORAGE_NOT_FOUND => "Run or artifact not found",
        ErrorCode::STORAGE_ALREADY_EXISTS => "Artifact already exists",
        ErrorCode::STORAGE_CORRUPTED => "Artifact is corrupted",
        ErrorCode::STORAGE_SERIALIZATION_ERROR => "Artifact serialization error",

        ErrorCode::SCHEMA_PARSE => "Schema document could not be parsed",
        ErrorCode::SCHEMA_INVALID_COLUMNS => "Schema columns have an unsupported shape",

        ErrorCode::DATA_INVALID => "Invalid input data",
        ErrorCode::DATA_MISSING_TARGET => "Target column missing",
        ErrorCode::DATA_NON_NUMERIC => "Column cannot be converted to numbers",
        ErrorCode::DATA_TOO_SMALL => "Not enough rows",
        ErrorCode::DATA_SHAPE_MISMATCH => "Array shape does not match the model",

        ErrorCode::STAGE_VALIDATION_FAILED => "Data failed schema validation",
        ErrorCode::STAGE_TASK_FAILED => "Blocking worker task did not complete",

        _ => "Unknown error",
    }
}
