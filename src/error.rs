use thiserror::Error;

use crate::{entity::Id, type_tag::TypeTag};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reason a constructor refused the `(owner, id)` it was called with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructError {
    #[error("Invalid Id: {0}")]
    InvalidId(Id),

    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ConstructError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("No Type Registered: pool of {0}")]
    NotRegistered(TypeTag),

    #[error("Construct Error ({type_tag}): {source}")]
    Construct {
        type_tag: TypeTag,
        #[source]
        source: ConstructError,
    },

    #[error("Dynamic Cast Failed: got ({0}), but expected({1})")]
    DynamicCastFail(TypeTag, TypeTag),

    #[error("Identity Mismatch ({type_tag}): asked for ({expected_owner}, {expected_id}), constructed ({got_owner}, {got_id})")]
    IdentityMismatch {
        type_tag: TypeTag,
        expected_owner: String,
        expected_id: Id,
        got_owner: String,
        got_id: Id,
    },

    #[error("Duplicate Entry ({type_tag}): id {id} is already live for this owner")]
    Duplicate { type_tag: TypeTag, id: Id },

    #[error("Invalid Type Tag: {0:?}")]
    InvalidTypeTag(String),

    #[error("Unknown Type: {0}")]
    UnknownType(TypeTag),
}

impl Error {
    /// Configuration errors: nothing usable was registered.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NotRegistered(..) | Error::InvalidTypeTag(..) | Error::UnknownType(..)
        )
    }

    /// Construction errors: a constructor ran but its result is unusable.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::Construct { .. } | Error::DynamicCastFail(..) | Error::IdentityMismatch { .. }
        )
    }
}
