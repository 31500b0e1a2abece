use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers carrying the authentication material.
pub const X_DATE: &str = "x-date";
pub const X_CONTENT_SHA256: &str = "x-content-sha256";

/// Signature algorithm name as it appears in the Authorization header.
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Terminal element of the credential scope and of the signing-key chain.
pub const REQUEST_SUFFIX: &str = "request";

// Env values used to load the credential.
pub const ACCESS_KEY: &str = "ACCESS_KEY";
pub const SECRET_KEY: &str = "SECRET_KEY";

/// Provider result code of a successful response.
pub const SUCCESS_CODE: i64 = 10000;

/// AsciiSet for query canonicalization.
///
/// Every byte is encoded except the unreserved characters
/// 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
