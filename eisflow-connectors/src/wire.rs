//! Wire-level projection of the service contract
//!
//! Fixes the JSON shape of the three operations and their outcomes.
//! Faults travel as tagged variants rather than transport-level errors, so
//! a caller can always distinguish "correct your input" from "the session
//! is broken" without parsing free text.
//!
//! ```
//! use eisflow_connectors::wire::{Request, Response, dispatch};
//! # use eisflow_core::{SessionService, storage::memory::MemoryStorageProvider};
//!
//! let service = SessionService::new(MemoryStorageProvider::new());
//! let request: Request = serde_json::from_str(r#"{"op":"end_session"}"#)?;
//! let response = dispatch(&service, request);
//! assert!(matches!(response, Response::ValidationFault { .. }));
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use eisflow_core::{Ack, EisService, Fault, Sample, ServiceResult, SessionDescriptor};

/// Request envelope for the three operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Begin a session.
    StartSession {
        /// Session descriptor; absent when the caller sent nothing usable.
        meta: Option<SessionDescriptor>,
    },
    /// Push one measurement.
    PushSample {
        /// The measurement; absent when the caller sent nothing usable.
        sample: Option<Sample>,
    },
    /// Finish the active session.
    EndSession,
}

/// Response envelope: acknowledgment or tagged fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Response {
    /// Operation succeeded.
    Ack {
        /// The acknowledgment payload.
        ack: Ack,
    },
    /// Input rejected; the caller can correct and retry.
    ValidationFault {
        /// Violation description.
        message: String,
        /// Violated field.
        field: String,
        /// Offending value.
        value: String,
    },
    /// Internal failure; the session may be inconsistent.
    DataFormatFault {
        /// Failure description.
        message: String,
        /// Optional diagnostic detail.
        details: Option<String>,
    },
}

impl Response {
    /// Project an operation outcome onto the wire.
    pub fn from_result(result: ServiceResult<Ack>) -> Self {
        match result {
            Ok(ack) => Response::Ack { ack },
            Err(Fault::Validation(fault)) => Response::ValidationFault {
                message: fault.message,
                field: fault.field,
                value: fault.value,
            },
            Err(Fault::DataFormat(fault)) => Response::DataFormatFault {
                message: fault.message,
                details: fault.details,
            },
        }
    }

    /// Reconstruct the operation outcome from the wire.
    pub fn into_result(self) -> ServiceResult<Ack> {
        match self {
            Response::Ack { ack } => Ok(ack),
            Response::ValidationFault {
                message,
                field,
                value,
            } => Err(eisflow_core::ValidationFault {
                message,
                field,
                value,
            }
            .into()),
            Response::DataFormatFault { message, details } => {
                Err(eisflow_core::DataFormatFault { message, details }.into())
            }
        }
    }
}

/// Execute one decoded request against a service handle.
///
/// Missing payloads are rejected here; the core's typed operations never
/// see an absent descriptor or sample.
pub fn dispatch<S: EisService>(service: &S, request: Request) -> Response {
    let result = match request {
        Request::StartSession { meta: Some(meta) } => service.start_session(meta),
        Request::StartSession { meta: None } => {
            Err(eisflow_core::ValidationFault::new("meta is required", "meta", "null").into())
        }
        Request::PushSample {
            sample: Some(sample),
        } => service.push_sample(sample),
        Request::PushSample { sample: None } => {
            Err(eisflow_core::ValidationFault::new("sample is required", "sample", "null").into())
        }
        Request::EndSession => service.end_session(),
    };
    Response::from_result(result)
}
