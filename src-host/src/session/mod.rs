// Session partitions the worker is bound to
// Proxy binding and cookie persistence operate on the SessionPartition trait

pub mod cookies;
pub mod partition;
pub mod persistence;
pub mod proxy;

pub use cookies::{merge_cookies, CookieKey, CookieRecord};
pub use partition::{
    HeaderRewrite, MemorySession, ProxyRules, RequestHeaders, SessionPartition, SessionRegistry,
    DEFAULT_SESSION,
};
pub use persistence::{persist_session_cookies, restore_session_cookies, CookieStore, RestoreReport};
pub use proxy::{bind, ProxyBinding, ACCEPT_ENCODING};
