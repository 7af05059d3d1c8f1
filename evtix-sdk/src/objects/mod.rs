//! Request and response bodies exchanged with the evtix server.

pub mod admin;
pub mod error;
pub mod event;
pub mod payment;

pub use error::{ErrorBody, ErrorKind};
pub use event::{
    ChangeEventStatusRequest, CouponCheckRequest, CouponQuote, EventResponse, EventStatus,
    JoinEventRequest, JoinEventResponse, LeaveEventRequest,
};
pub use payment::{
    CallbackAck, GatewayPaymentStatus, GetPaymentRequest, PaymentCallback, PaymentResponse,
    PaymentStatus,
};
