//! Vendor error code lookup.
//!
//! The user-pool API reports failures as exception names. This table is the
//! only place those names appear; everything else works with [`ErrorKind`].

use super::ErrorKind;

/// Vendor exception name to local error kind.
const VENDOR_CODES: &[(&str, ErrorKind)] = &[
    ("TooManyRequestsException", ErrorKind::Throttled),
    ("ThrottlingException", ErrorKind::Throttled),
    ("ResourceNotFoundException", ErrorKind::NotFound),
    ("UserNotFoundException", ErrorKind::NotFound),
    ("NotAuthorizedException", ErrorKind::PermissionDenied),
    ("AccessDeniedException", ErrorKind::PermissionDenied),
    ("UnrecognizedClientException", ErrorKind::PermissionDenied),
    ("InvalidParameterException", ErrorKind::InvalidParameter),
    ("UsernameExistsException", ErrorKind::AlreadyExists),
    ("GroupExistsException", ErrorKind::AlreadyExists),
    ("InternalErrorException", ErrorKind::Internal),
];

/// Classify a vendor error code.
///
/// A missing code means the call never produced a service response
/// (connection failure, timeout) and maps to [`ErrorKind::Unavailable`].
/// Codes absent from the table map to [`ErrorKind::Unknown`].
pub fn classify(code: Option<&str>) -> ErrorKind {
    let Some(code) = code else {
        return ErrorKind::Unavailable;
    };

    VENDOR_CODES
        .iter()
        .find(|(vendor, _)| *vendor == code)
        .map_or(ErrorKind::Unknown, |(_, kind)| *kind)
}
