pub mod quote;
pub mod quote_request;
pub mod status;
pub mod version;
