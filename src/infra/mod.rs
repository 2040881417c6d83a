// Concrete adapters for the ports in `app::ports`

pub mod http_client;
pub mod json_calendar;
pub mod tracing_display;

pub use http_client::ReqwestHttp;
pub use json_calendar::JsonCalendarStore;
pub use tracing_display::TracingDisplay;
