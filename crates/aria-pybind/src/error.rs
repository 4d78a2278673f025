//! Error Types for the Native Bridge
//!
//! Every failure produced by this crate is a typed value returned to the
//! caller. The embedding runtime decides whether to raise it as a guest
//! exception or recover locally.
//!
//! ## Error Categories
//!
//! - Attribute errors: missing attribute or method, field not settable,
//!   unbound descriptor slot
//! - Type errors: incompatible assignment, unsupported host type,
//!   non-callable callee
//! - Arity errors: argument count mismatch on a bridged method call
//! - Overflow errors: integer outside the target width
//! - Recursion errors: marshalling depth limit exceeded

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Category of a bridge failure, used to pick the guest exception type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Attribute absent, not settable, or descriptor slot unbound
    Attribute,
    /// Incompatible value type or unsupported host type
    Type,
    /// Argument count mismatch
    Arity,
    /// Integer does not fit the requested width
    Overflow,
    /// Nesting deeper than the configured marshalling limit
    Recursion,
}

impl ErrorKind {
    /// Name of the guest exception raised for this kind
    pub fn exception_type(self) -> &'static str {
        match self {
            ErrorKind::Attribute => "AttributeError",
            ErrorKind::Type | ErrorKind::Arity => "TypeError",
            ErrorKind::Overflow => "OverflowError",
            ErrorKind::Recursion => "RecursionError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exception_type())
    }
}

/// Descriptor slot an access was attempted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotAction {
    Get,
    Set,
    Delete,
}

impl fmt::Display for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotAction::Get => write!(f, "get"),
            SlotAction::Set => write!(f, "set"),
            SlotAction::Delete => write!(f, "delete"),
        }
    }
}

/// Bridge error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Attribute or method not exposed by the object's type
    #[error("'{type_name}' object has no attribute '{name}'")]
    NoAttribute {
        /// Type of the object
        type_name: SmolStr,
        /// Requested attribute name
        name: SmolStr,
    },

    /// Field is exposed but read-only
    #[error("'{name}' attribute is not settable")]
    NotSettable {
        /// Exposed field name
        name: SmolStr,
    },

    /// Descriptor has nothing bound in the requested slot
    #[error("can't {action} attribute")]
    UnboundSlot {
        /// Slot that was accessed
        action: SlotAction,
    },

    /// Value type cannot be assigned to the declared type
    #[error("'{source_type}' type is not assignable to '{target_type}' type")]
    NotAssignable {
        /// Runtime type of the supplied value
        source_type: SmolStr,
        /// Declared type of the destination
        target_type: SmolStr,
    },

    /// Host type has no dynamic representation
    #[error("'{type_name}' type is unsupported")]
    Unsupported {
        /// Concrete host type name
        type_name: SmolStr,
    },

    /// Callee is not callable
    #[error("'{type_name}' object is not callable")]
    NotCallable {
        /// Type of the callee
        type_name: SmolStr,
    },

    /// Value passed the type check but could not be rebuilt as the host type
    #[error("cannot convert value to '{type_name}'")]
    ConversionFailed {
        /// Declared host type
        type_name: SmolStr,
    },

    /// Wrong number of positional arguments
    #[error("{name}() takes exactly {expected} arguments ({given} given)")]
    ArgumentCount {
        /// Method or callable name
        name: SmolStr,
        /// Number of arguments supplied
        given: usize,
        /// Minimum accepted count
        min: usize,
        /// Maximum accepted count
        max: usize,
        /// Declared parameter count
        expected: usize,
    },

    /// Integer outside the representable range
    #[error("int too large to convert to '{target_type}'")]
    Overflow {
        /// Decimal rendering of the value
        value: String,
        /// Target type name
        target_type: SmolStr,
    },

    /// Nesting deeper than the marshalling limit
    #[error("maximum recursion depth exceeded while marshalling '{type_name}'")]
    RecursionLimit {
        /// Type at which the limit was hit
        type_name: SmolStr,
        /// Configured limit
        limit: usize,
    },
}

impl BridgeError {
    /// Create a missing attribute error
    pub fn no_attribute(type_name: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        BridgeError::NoAttribute {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// Create a read-only field error
    pub fn not_settable(name: impl Into<SmolStr>) -> Self {
        BridgeError::NotSettable { name: name.into() }
    }

    /// Create an unbound descriptor slot error
    pub fn unbound_slot(action: SlotAction) -> Self {
        BridgeError::UnboundSlot { action }
    }

    /// Create an incompatible assignment error
    pub fn not_assignable(source_type: impl Into<SmolStr>, target_type: impl Into<SmolStr>) -> Self {
        BridgeError::NotAssignable {
            source_type: source_type.into(),
            target_type: target_type.into(),
        }
    }

    /// Create an unsupported host type error
    pub fn unsupported(type_name: impl Into<SmolStr>) -> Self {
        BridgeError::Unsupported {
            type_name: type_name.into(),
        }
    }

    /// Create a not callable error
    pub fn not_callable(type_name: impl Into<SmolStr>) -> Self {
        BridgeError::NotCallable {
            type_name: type_name.into(),
        }
    }

    /// Create a conversion failure error
    pub fn conversion_failed(type_name: impl Into<SmolStr>) -> Self {
        BridgeError::ConversionFailed {
            type_name: type_name.into(),
        }
    }

    /// Create an arity error for a callable with a fixed parameter count
    pub fn arity(name: impl Into<SmolStr>, given: usize, expected: usize) -> Self {
        BridgeError::ArgumentCount {
            name: name.into(),
            given,
            min: expected,
            max: expected,
            expected,
        }
    }

    /// Create a numeric overflow error
    pub fn overflow(value: impl fmt::Display, target_type: impl Into<SmolStr>) -> Self {
        BridgeError::Overflow {
            value: value.to_string(),
            target_type: target_type.into(),
        }
    }

    /// Create a recursion limit error
    pub fn recursion_limit(type_name: impl Into<SmolStr>, limit: usize) -> Self {
        BridgeError::RecursionLimit {
            type_name: type_name.into(),
            limit,
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NoAttribute { .. }
            | BridgeError::NotSettable { .. }
            | BridgeError::UnboundSlot { .. } => ErrorKind::Attribute,
            BridgeError::NotAssignable { .. }
            | BridgeError::Unsupported { .. }
            | BridgeError::NotCallable { .. }
            | BridgeError::ConversionFailed { .. } => ErrorKind::Type,
            BridgeError::ArgumentCount { .. } => ErrorKind::Arity,
            BridgeError::Overflow { .. } => ErrorKind::Overflow,
            BridgeError::RecursionLimit { .. } => ErrorKind::Recursion,
        }
    }

    /// Name of the guest exception this error is raised as
    pub fn exception_type(&self) -> &'static str {
        self.kind().exception_type()
    }

    /// Check if this is an attribute error
    pub fn is_attribute_error(&self) -> bool {
        self.kind() == ErrorKind::Attribute
    }

    /// Check if this is a type error (arity errors excluded)
    pub fn is_type_error(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    /// Check if this is an arity error
    pub fn is_arity_error(&self) -> bool {
        self.kind() == ErrorKind::Arity
    }
}
