//! Function signatures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Parameter types and the single return type of a function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    params: Vec<ValueType>,
    ret: ValueType,
}

impl FunctionSignature {
    /// Create a signature from its parameter and return types
    pub fn new(params: impl Into<Vec<ValueType>>, ret: ValueType) -> Self {
        Self {
            params: params.into(),
            ret,
        }
    }

    /// `() -> int32`
    pub fn i_v() -> Self {
        Self::new([], ValueType::Int32)
    }

    /// `(int32) -> int32`
    pub fn i_i() -> Self {
        Self::new([ValueType::Int32], ValueType::Int32)
    }

    /// `(int32, int32) -> int32`
    pub fn i_ii() -> Self {
        Self::new([ValueType::Int32; 2], ValueType::Int32)
    }

    /// `(int32, int32, int32) -> int32`
    pub fn i_iii() -> Self {
        Self::new([ValueType::Int32; 3], ValueType::Int32)
    }

    /// Parameter types, in order
    #[inline]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Number of parameters
    #[inline]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Return type
    #[inline]
    pub fn return_type(&self) -> ValueType {
        self.ret
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_signatures() {
        assert_eq!(FunctionSignature::i_v().param_count(), 0);
        assert_eq!(FunctionSignature::i_ii().param_count(), 2);
        assert_eq!(FunctionSignature::i_iii().params()[2], ValueType::Int32);
        assert_eq!(FunctionSignature::i_i().return_type(), ValueType::Int32);
    }

    #[test]
    fn test_display() {
        let sig = FunctionSignature::new([ValueType::Int32, ValueType::Float64], ValueType::Float32);
        assert_eq!(sig.to_string(), "(int32, float64) -> float32");
    }
}
