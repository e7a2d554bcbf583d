//! Contract between the dispatcher and whatever carries requests to it.
//!
//! A transport pulls the message id and payload out of its own request type and
//! knows how to write a reply. [`Dispatcher::serve`](crate::Dispatcher::serve)
//! drives the contract for one request; the HTTP binding in
//! [`server`](crate::server) is one implementation, and tests implement it over
//! plain structs.

use crate::context::Context;
use crate::error::DispatchError;
use crate::message::{MessageId, Payload};

pub trait Transport {
    /// Per-request state owned by the transport
    type Request;

    /// Identifier of the message to dispatch. A missing or malformed id is a
    /// [`DispatchError::BadRequest`].
    fn message_id(&self, req: &Self::Request) -> Result<MessageId, DispatchError>;

    /// Decode source for the request; may be [`Payload::Empty`].
    fn payload<'a>(&self, req: &'a Self::Request) -> Payload<'a>;

    /// Context for the dispatch. Override to carry a transport request id,
    /// cancellation token or deadline.
    fn context(&self, _req: &Self::Request, id: &MessageId) -> Context {
        Context::new(id)
    }

    /// Deliver a successful, already encoded response.
    fn write_response(&self, req: &mut Self::Request, body: Vec<u8>);

    /// Deliver a failure.
    fn report_error(&self, req: &mut Self::Request, err: &DispatchError);
}
