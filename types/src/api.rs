mod request;
mod response;

pub use request::{JobInput, SubmitRequest};
pub use response::error::{ErrorBody, ErrorPayload};
pub use response::{AssistantResponse, JobOutput, StatusResponse, SubmitResponse, UserInput};
