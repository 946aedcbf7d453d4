//! Conversation layer: sessions, the state machine and notifications

pub mod machine;
pub mod notifier;
pub mod session;
pub mod transport;

pub use machine::{Inbound, RegistrationFlow};
pub use notifier::Notifier;
pub use session::{Session, State, WalletType};
pub use transport::{ChatTransport, Keyboard};
