//! Role model and the single decision function every mutation path consults.

mod policy;
mod role;

pub use policy::{authorize, Action, Decision, DenyReason, Subject, Target};
pub use role::Role;

use tracing::warn;

/// Runs [`authorize`] and logs denials.
pub fn enforce(subject: Subject, target: Target, action: Action) -> Result<(), DenyReason> {
    let decision = authorize(subject, target, action);
    if let Decision::Deny(reason) = decision {
        warn!(
            requester = %subject.id,
            role = %subject.role,
            %action,
            kind = ?target.kind,
            owner = ?target.owner_id,
            reason = reason.code(),
            "authorization denied"
        );
    }
    decision.into_result()
}
