pub mod cache;
pub mod config;
pub mod convertor;
pub mod exception;
pub mod header;
pub mod multidict;
pub mod multipart;
pub mod param;
pub mod parsers;
pub mod request;
pub mod routing;
pub mod upload;
pub mod url;

pub use cache::ParseCache;
pub use config::ParserConfig;
pub use convertor::{Convertor, ConvertorRegistry, PathValue, Uuid};
pub use exception::Exception;
pub use header::{parse_content_header, ContentHeader, Headers};
pub use multidict::{FieldValue, MultiDict, QueryParams};
pub use multipart::{parse_multipart, FormData, FormValue, MultipartParser};
pub use parsers::{parse_cookie_string, parse_query_string, parse_url_encoded_form};
pub use request::Request;
pub use routing::{compile_path, compile_path_with, CompiledPath};
pub use upload::UploadFile;
pub use url::{Address, Replace, Scope, URL};
