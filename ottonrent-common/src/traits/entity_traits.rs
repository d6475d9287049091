use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ValidationError;

/// Entity-specific required-field rules, checked before any write.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Anything a panel can mirror and edit.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + PartialEq + Validate + Send + Sync + 'static
{
}

impl<T> Entity for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Validate + Send + Sync + 'static
{
}

/// Plain flags (user active, order used) carry no required fields.
impl Validate for bool {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Untyped subtrees, e.g. when only following a path.
impl Validate for serde_json::Value {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
