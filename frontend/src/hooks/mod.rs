pub mod use_debounce;
pub mod use_periodic_refresh;

pub use use_debounce::Debouncer;
pub use use_periodic_refresh::{PeriodicRefresh, PeriodicRefreshConfig};
