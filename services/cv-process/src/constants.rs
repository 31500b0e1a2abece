// Query parameters carrying the authentication material.
pub const QUERY_API_KEY: &str = "api_key";
pub const QUERY_TIMESTAMP: &str = "timestamp";
pub const QUERY_NONCE: &str = "nonce";
pub const QUERY_SIGN: &str = "sign";

// Env values used to load the credential.
pub const CV_API_KEY: &str = "CV_API_KEY";
pub const CV_SECURITY_KEY: &str = "CV_SECURITY_KEY";
