pub mod api_client;
pub mod gateway;

pub use api_client::{DataApi, HttpDataApi, Scope};
pub use gateway::{DataGateway, DataOp};
