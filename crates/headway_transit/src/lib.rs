pub mod catalog;
pub mod error;
pub mod oracle;
pub mod service_time;
pub mod stop;
pub mod tables;
pub mod trip;

mod newtype_index;
