mod github;
mod resolve;
mod transport;

pub use github::{parse_content_disposition_file_name, GithubTransport, DEFAULT_USER_AGENT};
pub use resolve::{latest_release_url, resolve_latest_release, ResolveOutcome};
pub use transport::{HttpTransport, StaticRoute, StaticTransport, TransportResponse};
