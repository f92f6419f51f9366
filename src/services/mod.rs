pub mod forecasting;
pub mod order_provider;
pub mod store_batch;

pub use forecasting::{Clock, FixedClock, ForecastService, StoreForecast, SystemClock};
pub use order_provider::{HttpOrderProvider, OrderProvider};
pub use store_batch::{run_store_batch, ItemFault, PerItemForecast};
