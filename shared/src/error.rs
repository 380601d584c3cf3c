//! Error taxonomy for asset decoding and transform operations

use crate::format::AssetFormat;

/// Result alias for reader, codec and scene operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Every failure a codec or transform can report.
///
/// Offsets are absolute positions in the buffer being decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    #[error("read of {requested} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        len: usize,
    },

    #[error("string starting at offset {offset} has no terminator")]
    UnterminatedString { offset: usize },

    #[error("unsupported version tag {tag:?}")]
    UnsupportedVersion { tag: String },

    #[error(
        "{what}: {count} entries need {needed} bytes but only {available} remain at offset {offset}"
    )]
    TruncatedData {
        what: &'static str,
        count: usize,
        needed: usize,
        available: usize,
        offset: usize,
    },

    #[error("malformed structure at offset {offset}: {reason}")]
    MalformedStructure { offset: usize, reason: String },

    #[error("node {node} cannot be resolved: parent {parent} never resolves")]
    CyclicHierarchy { node: usize, parent: usize },

    /// Decoded documents that are fine on their own but disagree when combined.
    #[error("invalid reference: {reason}")]
    InvalidReference { reason: String },
}

impl AssetError {
    /// Shorthand for [`AssetError::MalformedStructure`].
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedStructure {
            offset,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AssetError::InvalidReference`].
    pub fn invalid_reference(reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reason: reason.into(),
        }
    }

    /// Byte offset the error refers to, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::OutOfBounds { offset, .. }
            | Self::UnterminatedString { offset }
            | Self::TruncatedData { offset, .. }
            | Self::MalformedStructure { offset, .. } => Some(*offset),
            Self::UnsupportedVersion { .. } => Some(0),
            Self::CyclicHierarchy { .. } | Self::InvalidReference { .. } => None,
        }
    }
}

/// A codec failure tagged with the format that was being decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{format} parse failed: {source}")]
pub struct ParseError {
    pub format: AssetFormat,
    pub source: AssetError,
}

impl ParseError {
    pub fn new(format: AssetFormat, source: AssetError) -> Self {
        Self { format, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssetError::OutOfBounds {
            offset: 12,
            requested: 4,
            len: 14,
        };
        assert_eq!(
            err.to_string(),
            "read of 4 bytes at offset 12 exceeds buffer length 14"
        );

        let err = AssetError::malformed(40, "triangle index 9 >= vertex count 4");
        assert_eq!(
            err.to_string(),
            "malformed structure at offset 40: triangle index 9 >= vertex count 4"
        );
    }

    #[test]
    fn test_parse_error_names_format_and_offset() {
        let err = ParseError::new(
            AssetFormat::Mesh,
            AssetError::UnterminatedString { offset: 3 },
        );
        let text = err.to_string();
        assert!(text.starts_with("mesh (ZMS) parse failed"));
        assert!(text.contains("offset 3"));
        assert_eq!(err.source.offset(), Some(3));
    }

    #[test]
    fn test_cyclic_has_no_offset() {
        let err = AssetError::CyclicHierarchy { node: 2, parent: 3 };
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_invalid_reference_has_no_offset() {
        let err = AssetError::invalid_reference("bone slot 3 maps to node 9");
        assert_eq!(err.offset(), None);
        assert_eq!(err.to_string(), "invalid reference: bone slot 3 maps to node 9");
    }
}
