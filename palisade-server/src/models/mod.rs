pub mod cloud;
pub mod schedule;
pub mod service_link;
pub mod settings;
