pub mod decode;
pub mod http;
