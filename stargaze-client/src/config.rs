//! Environment and host configuration

use remote_dispatch::ApiHosts;

/// Environment variable selecting the realtime endpoint location.
pub const SOCKET_LOC: &str = "SOCKET_LOC";

/// Host table for the logical api targets the guards address.
///
/// The content api is same-origin; the github target points at the public
/// api. Callers with different deployments pass their own table through
/// [`StoreOptions`](crate::store::StoreOptions).
pub fn default_hosts() -> ApiHosts {
    ApiHosts::new()
        .with(crate::guards::API, "")
        .with(crate::guards::GITHUB, "https://api.github.com")
}

/// Where the realtime transport should connect.
///
/// `None` means same-origin: the variable is unset or empty.
pub fn socket_location() -> Option<String> {
    std::env::var(SOCKET_LOC).ok().filter(|loc| !loc.is_empty())
}
