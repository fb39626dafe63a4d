//! Token lifecycle and authenticated request execution
//!
//! Leaf-first: [`ports::TokenStore`] → [`gate::TokenGate`] →
//! [`refresher::TokenRefresher`] → [`executor::AuthenticatedRequestExecutor`]
//! → [`session::SessionController`].

pub mod context;
pub mod executor;
pub mod gate;
pub mod ports;
pub mod refresher;
pub mod session;
pub mod single_flight;

pub use context::SessionContext;
pub use executor::AuthenticatedRequestExecutor;
pub use gate::TokenGate;
pub use ports::{Clock, HttpTransport, SystemClock, TokenStore};
pub use refresher::{RefreshMode, TokenRefresher};
pub use session::SessionController;
pub use single_flight::SingleFlight;
