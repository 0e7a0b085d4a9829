//! The closed set of HTTP statuses a compliant server is expected to return.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RespCode {
    /// Request accepted and response provided.
    Ok,
    /// Request accepted but matches no data.
    NotFound,
    /// Validation or semantic constraint violated.
    BadRequest,
    /// Facility not implemented. Also stands in for any unlisted status.
    NotImplemented,
}

impl RespCode {
    const ALL: [RespCode; 4] = [
        RespCode::Ok,
        RespCode::NotFound,
        RespCode::BadRequest,
        RespCode::NotImplemented,
    ];

    pub fn code(self) -> u16 {
        match self {
            RespCode::Ok => 200,
            RespCode::NotFound => 404,
            RespCode::BadRequest => 400,
            RespCode::NotImplemented => 501,
        }
    }

    /// Map a numeric status; anything unlisted becomes `NotImplemented`.
    pub fn from_code(code: u16) -> Self {
        match Self::ALL.into_iter().find(|rc| rc.code() == code) {
            Some(rc) => rc,
            None => {
                tracing::warn!(status = code, "unexpected HTTP status, recording as NOT_IMPLEMENTED");
                RespCode::NotImplemented
            }
        }
    }

    pub fn is_known(code: u16) -> bool {
        Self::ALL.iter().any(|rc| rc.code() == code)
    }
}

impl fmt::Display for RespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RespCode::Ok => "OK",
            RespCode::NotFound => "NOT_FOUND",
            RespCode::BadRequest => "BAD_REQUEST",
            RespCode::NotImplemented => "NOT_IMPLEMENTED",
        };
        write!(f, "{name}({})", self.code())
    }
}
