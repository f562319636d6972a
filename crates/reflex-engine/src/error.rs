//! Error types for the reflection engine

use crate::type_desc::TypeDesc;

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Reflection error kinds
///
/// Every failure is raised synchronously to the immediate caller. None of
/// them leave a registry or type record partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectError {
    /// No type record exists for the requested type or display name
    #[error("Type not registered: {0}")]
    NotRegistered(String),

    /// Member absent from the member table and every ancestor table
    #[error("Member \"{member}\" not found on {type_name}")]
    MemberNotFound {
        /// Owning type name
        type_name: String,
        /// Requested member name
        member: String,
    },

    /// Stored type descriptor disagrees with the requested one
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Write through a const member, or a non-const method called on a shared receiver
    #[error("\"{name}\" of {type_name} is const")]
    ConstViolation {
        /// Owning type name
        type_name: String,
        /// Member or method name
        name: String,
    },

    /// No overload matches the requested name and signature
    #[error("Method \"{method}\" not found on {type_name}, or the signature mismatched")]
    MethodNotFound {
        /// Owning type name (or the function namespace)
        type_name: String,
        /// Requested method name
        method: String,
    },

    /// Member type has no assignment strategy
    #[error("Member \"{member}\" of {type_name} cannot be assigned")]
    NotAssignable {
        /// Owning type name
        type_name: String,
        /// Member name
        member: String,
    },

    /// Metadata key absent
    #[error("Metadata \"{key}\" not found on {type_name}")]
    MetadataNotFound {
        /// Owning type name
        type_name: String,
        /// Metadata key
        key: String,
    },

    /// Two overloads under one name share an argument signature
    #[error("Duplicate overload {method}({signature}) on {type_name}")]
    DuplicateOverload {
        /// Owning type name
        type_name: String,
        /// Method name
        method: String,
        /// Comma separated argument type names
        signature: String,
    },

    /// An adapter received the wrong number of arguments
    #[error("Argument count mismatch: expected {expected}, got {got}")]
    ArgumentCount {
        /// Declared arity
        expected: usize,
        /// Supplied arity
        got: usize,
    },

    /// Type published twice while replacement is disabled
    #[error("Type already registered: {0}")]
    AlreadyRegistered(String),

    /// Shared value is borrowed incompatibly, or still shared when taken
    #[error("Value of type {0} is already borrowed or shared")]
    Borrowed(String),
}

impl ReflectError {
    pub(crate) fn type_mismatch(expected: TypeDesc, got: TypeDesc) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.name().to_string(),
            got: got.name().to_string(),
        }
    }

    /// Mismatch against an erased value, whose only identity is its `TypeId`
    pub(crate) fn value_mismatch(expected: TypeDesc, value: &dyn std::any::Any) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.name().to_string(),
            got: format!("{:?}", value.type_id()),
        }
    }

    pub(crate) fn member_not_found(owner: TypeDesc, member: &str) -> Self {
        ReflectError::MemberNotFound {
            type_name: owner.name().to_string(),
            member: member.to_string(),
        }
    }

    pub(crate) fn method_not_found(owner: &str, method: &str) -> Self {
        ReflectError::MethodNotFound {
            type_name: owner.to_string(),
            method: method.to_string(),
        }
    }

    pub(crate) fn const_violation(owner: TypeDesc, name: &str) -> Self {
        ReflectError::ConstViolation {
            type_name: owner.name().to_string(),
            name: name.to_string(),
        }
    }
}
