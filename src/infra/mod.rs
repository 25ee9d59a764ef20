// Adapters speaking the hosted backend's REST conventions. The wizard only
// sees the ports in `storage`; everything service-specific lives here.

pub mod hosted_store;
pub mod object_store;
pub mod session;

pub use hosted_store::HostedRecordStore;
pub use object_store::HostedObjectStore;
pub use session::HostedSessionProvider;

use crate::error::{RegistrarError, Result};

/// Service key resolution, in priority order. The service-role key wins
/// over the anon key when both are present.
pub(crate) fn service_key() -> Result<String> {
    std::env::var("REGISTRAR_SERVICE_KEY")
        .or_else(|_| std::env::var("SUPABASE_SERVICE_ROLE_KEY"))
        .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
        .map_err(|_| RegistrarError::Config("missing service key: set REGISTRAR_SERVICE_KEY".to_string()))
}
