//! ATT error codes as seen by the OTS engines
use super::constants::*;
use thiserror::Error;

/// ATT error codes, including the OTS application range
///
/// ATT success is not a variant: successful outcomes are `Ok` values of
/// [`AttResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttErrorCode {
    #[error("invalid handle")]
    InvalidHandle,
    #[error("read not permitted")]
    ReadNotPermitted,
    #[error("write not permitted")]
    WriteNotPermitted,
    #[error("invalid PDU")]
    InvalidPdu,
    #[error("insufficient authentication")]
    InsufficientAuthentication,
    #[error("request not supported")]
    RequestNotSupported,
    #[error("invalid offset")]
    InvalidOffset,
    #[error("insufficient authorization")]
    InsufficientAuthorization,
    #[error("prepare queue full")]
    PrepareQueueFull,
    #[error("attribute not found")]
    AttributeNotFound,
    #[error("attribute not long")]
    AttributeNotLong,
    #[error("insufficient encryption key size")]
    InsufficientEncryptionKeySize,
    #[error("invalid attribute value length")]
    InvalidAttributeValueLength,
    #[error("unlikely error")]
    Unlikely,
    #[error("insufficient encryption")]
    InsufficientEncryption,
    #[error("unsupported group type")]
    UnsupportedGroupType,
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("database out of sync")]
    DatabaseOutOfSync,
    #[error("value not allowed")]
    ValueNotAllowed,
    /// Write request rejected (OTS)
    #[error("write request rejected")]
    WriteRequestRejected,
    /// No object is selected for the connection (OTS)
    #[error("object not selected")]
    ObjectNotSelected,
    /// No session slot is left for the connection (OTS)
    #[error("concurrency limit exceeded")]
    ConcurrencyLimitExceeded,
    /// Object name already exists (OTS)
    #[error("object name already exists")]
    ObjectNameAlreadyExists,
    /// Control point written without an enabled indication subscription
    #[error("client characteristic configuration descriptor improperly configured")]
    ImproperCccd,
    #[error("application error 0x{0:02x}")]
    Application(u8),
    #[error("common profile error 0x{0:02x}")]
    CommonProfile(u8),
    #[error("unknown ATT error 0x{0:02x}")]
    Unknown(u8),
}

/// Result type for operations that complete with an ATT status
pub type AttResult<T> = std::result::Result<T, AttErrorCode>;

impl From<u8> for AttErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ATT_ERROR_INVALID_HANDLE => AttErrorCode::InvalidHandle,
            ATT_ERROR_READ_NOT_PERMITTED => AttErrorCode::ReadNotPermitted,
            ATT_ERROR_WRITE_NOT_PERMITTED => AttErrorCode::WriteNotPermitted,
            ATT_ERROR_INVALID_PDU => AttErrorCode::InvalidPdu,
            ATT_ERROR_INSUFFICIENT_AUTHENTICATION => AttErrorCode::InsufficientAuthentication,
            ATT_ERROR_REQUEST_NOT_SUPPORTED => AttErrorCode::RequestNotSupported,
            ATT_ERROR_INVALID_OFFSET => AttErrorCode::InvalidOffset,
            ATT_ERROR_INSUFFICIENT_AUTHORIZATION => AttErrorCode::InsufficientAuthorization,
            ATT_ERROR_PREPARE_QUEUE_FULL => AttErrorCode::PrepareQueueFull,
            ATT_ERROR_ATTRIBUTE_NOT_FOUND => AttErrorCode::AttributeNotFound,
            ATT_ERROR_ATTRIBUTE_NOT_LONG => AttErrorCode::AttributeNotLong,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE => {
                AttErrorCode::InsufficientEncryptionKeySize
            }
            ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH => AttErrorCode::InvalidAttributeValueLength,
            ATT_ERROR_UNLIKELY => AttErrorCode::Unlikely,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION => AttErrorCode::InsufficientEncryption,
            ATT_ERROR_UNSUPPORTED_GROUP_TYPE => AttErrorCode::UnsupportedGroupType,
            ATT_ERROR_INSUFFICIENT_RESOURCES => AttErrorCode::InsufficientResources,
            ATT_ERROR_DATABASE_OUT_OF_SYNC => AttErrorCode::DatabaseOutOfSync,
            ATT_ERROR_VALUE_NOT_ALLOWED => AttErrorCode::ValueNotAllowed,
            ATT_ERROR_WRITE_REQUEST_REJECTED => AttErrorCode::WriteRequestRejected,
            ATT_ERROR_OBJECT_NOT_SELECTED => AttErrorCode::ObjectNotSelected,
            ATT_ERROR_CONCURRENCY_LIMIT_EXCEEDED => AttErrorCode::ConcurrencyLimitExceeded,
            ATT_ERROR_OBJECT_NAME_ALREADY_EXISTS => AttErrorCode::ObjectNameAlreadyExists,
            ATT_ERROR_IMPROPER_CCCD => AttErrorCode::ImproperCccd,
            ATT_ERROR_APPLICATION_ERROR_START..=ATT_ERROR_APPLICATION_ERROR_END => {
                AttErrorCode::Application(code)
            }
            ATT_ERROR_COMMON_PROFILE_ERROR_START..=ATT_ERROR_COMMON_PROFILE_ERROR_END => {
                AttErrorCode::CommonProfile(code)
            }
            _ => AttErrorCode::Unknown(code),
        }
    }
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> u8 {
        match code {
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidPdu => ATT_ERROR_INVALID_PDU,
            AttErrorCode::InsufficientAuthentication => ATT_ERROR_INSUFFICIENT_AUTHENTICATION,
            AttErrorCode::RequestNotSupported => ATT_ERROR_REQUEST_NOT_SUPPORTED,
            AttErrorCode::InvalidOffset => ATT_ERROR_INVALID_OFFSET,
            AttErrorCode::InsufficientAuthorization => ATT_ERROR_INSUFFICIENT_AUTHORIZATION,
            AttErrorCode::PrepareQueueFull => ATT_ERROR_PREPARE_QUEUE_FULL,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::AttributeNotLong => ATT_ERROR_ATTRIBUTE_NOT_LONG,
            AttErrorCode::InsufficientEncryptionKeySize => {
                ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE
            }
            AttErrorCode::InvalidAttributeValueLength => ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::InsufficientEncryption => ATT_ERROR_INSUFFICIENT_ENCRYPTION,
            AttErrorCode::UnsupportedGroupType => ATT_ERROR_UNSUPPORTED_GROUP_TYPE,
            AttErrorCode::InsufficientResources => ATT_ERROR_INSUFFICIENT_RESOURCES,
            AttErrorCode::DatabaseOutOfSync => ATT_ERROR_DATABASE_OUT_OF_SYNC,
            AttErrorCode::ValueNotAllowed => ATT_ERROR_VALUE_NOT_ALLOWED,
            AttErrorCode::WriteRequestRejected => ATT_ERROR_WRITE_REQUEST_REJECTED,
            AttErrorCode::ObjectNotSelected => ATT_ERROR_OBJECT_NOT_SELECTED,
            AttErrorCode::ConcurrencyLimitExceeded => ATT_ERROR_CONCURRENCY_LIMIT_EXCEEDED,
            AttErrorCode::ObjectNameAlreadyExists => ATT_ERROR_OBJECT_NAME_ALREADY_EXISTS,
            AttErrorCode::ImproperCccd => ATT_ERROR_IMPROPER_CCCD,
            AttErrorCode::Application(code) => code,
            AttErrorCode::CommonProfile(code) => code,
            AttErrorCode::Unknown(code) => code,
        }
    }
}

/// Convert a raw ATT status into a result, treating zero as success
pub fn check_status(code: u8) -> AttResult<()> {
    if code == ATT_ERROR_SUCCESS {
        Ok(())
    } else {
        Err(AttErrorCode::from(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ots_application_codes() {
        assert_eq!(AttErrorCode::from(0x81), AttErrorCode::ObjectNotSelected);
        assert_eq!(AttErrorCode::from(0xFD), AttErrorCode::ImproperCccd);
        assert_eq!(AttErrorCode::from(0x90), AttErrorCode::Application(0x90));
        assert_eq!(u8::from(AttErrorCode::ConcurrencyLimitExceeded), 0x82);
        assert_eq!(u8::from(AttErrorCode::WriteRequestRejected), 0x80);
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(0), Ok(()));
        assert_eq!(
            check_status(ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH),
            Err(AttErrorCode::InvalidAttributeValueLength)
        );
        assert_eq!(check_status(0x20), Err(AttErrorCode::Unknown(0x20)));
    }
}
