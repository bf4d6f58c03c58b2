use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("usage store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("unknown limit key: {0}")]
    UnknownLimitKey(String),
}
