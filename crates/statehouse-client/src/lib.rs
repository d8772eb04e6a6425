pub mod api;
pub mod cache;
pub mod request;
pub mod transport;

pub use api::{BillPage, CatalogApi, CheckAndUpdateResponse, FetchRecentResponse, MutationAck};
pub use cache::{RequestCache, REQUEST_CACHE_TTL};
pub use request::{ApiRequest, CallClass, JsonResponse, Method};
pub use transport::{CatalogTransport, HttpTransport};
