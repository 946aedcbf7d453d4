//! Persistence: link configuration, spreadsheet gateway and registration store

pub mod file_target;
pub mod google;
pub mod link;
pub mod record;
pub mod registry;
pub mod sheets;

// Re-exports for convenience
pub use file_target::{FileTarget, FileTargetError};
pub use google::{build_contexts, GoogleSheetsBackend, ServiceAccountKey, TokenSource};
pub use link::{LinkStore, LinkTarget};
pub use record::{PendingEntry, Registration, Status, HEADER};
pub use registry::{RegistrationStore, SaveOutcome};
pub use sheets::{GatewayError, SheetBackend, SheetContext, SheetError, SheetGateway};
