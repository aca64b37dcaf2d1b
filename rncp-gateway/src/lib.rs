//! RNCP Gateway - rate-limited, cached access to the 42 intra API
//!
//! ```text
//! get_user_data ──► LayeredCache ──[miss / refresh]──► Fetcher
//!                        ▲                               │ one task per request
//!                        │                               ▼
//!                        └──────── UserData ◄──── Dispatcher (FIFO, spaced)
//!                                                        │
//!                                                        ▼
//!                                                   Transport (reqwest)
//! ```

pub mod cache;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod keys;
pub mod mock;
pub mod records;
pub mod transport;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheHit, CacheStats, LayeredCache};
pub use dispatch::{Dispatcher, DispatcherConfig};
pub use error::GatewayError;
pub use fetcher::{Fetcher, FetcherConfig};
pub use gateway::{GatewayConfig, IntraGateway, UserData};
pub use keys::{CacheKey, ResourceKind};
pub use records::{CursusUser, Event, Me, ProjectUser};
pub use transport::{HttpTransport, Transport, TransportConfig};
