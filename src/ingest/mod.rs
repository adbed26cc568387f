pub mod http_upload;
pub mod ingestor;
pub mod validator;

pub use ingestor::{Ingestor, Upload};
pub use validator::UploadPolicy;
