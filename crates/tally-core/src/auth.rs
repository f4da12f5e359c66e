//! Admin Gate.

/// Decides whether a caller may run commands.
pub trait Authorizer: Send + Sync {
    /// Returns `true` if `caller_id` may run commands.
    fn is_authorized(&self, caller_id: &str) -> bool;
}

/// Only the configured admin may run commands.
///
/// An empty admin id authorizes nobody.
#[derive(Debug, Clone)]
pub struct AdminOnly {
    admin_id: String,
}

impl AdminOnly {
    /// Authorize exactly `admin_id`.
    pub fn new(admin_id: impl Into<String>) -> Self {
        Self {
            admin_id: admin_id.into(),
        }
    }
}

impl Authorizer for AdminOnly {
    fn is_authorized(&self, caller_id: &str) -> bool {
        !self.admin_id.is_empty() && caller_id == self.admin_id
    }
}

impl<F> Authorizer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller_id: &str) -> bool {
        self(caller_id)
    }
}
