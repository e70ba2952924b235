pub mod ports;
pub mod reconcile_use_case;
pub mod retrieve_use_case;
pub mod submit_use_case;
