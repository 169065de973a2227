//! The two venue stream clients, their shared backoff/state machinery, and
//! venue B's request signing.

mod backoff;
mod kalshi;
mod pm;
mod signing;
mod state;

pub use kalshi::{KalshiClientConfig, KalshiCredentials, KalshiStreamClient};
pub use pm::{PmClientConfig, PmStreamClient};
pub use signing::SigningKeyHandle;
pub use state::{ClientState, StateHandle};
