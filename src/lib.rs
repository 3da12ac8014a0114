pub mod credentials;
pub mod http;
pub mod observability;
pub mod serverless;
