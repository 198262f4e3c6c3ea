//! Wire types for the ACME DNS-01 webhook solver contract
//!
//! The certificate controller talks to a solver webhook through an
//! aggregated API group: it POSTs a `ChallengePayload` carrying a
//! [`ChallengeRequest`] and reads back the same envelope carrying a
//! [`ChallengeResponse`].

mod discovery;
mod messages;

pub use discovery::{ApiResource, ApiResourceList};
pub use messages::{
    ChallengeAction, ChallengePayload, ChallengeRequest, ChallengeResponse, PayloadError, Status,
    CHALLENGE_API_VERSION, CHALLENGE_PAYLOAD_KIND, SOLVER_VERSION,
};
