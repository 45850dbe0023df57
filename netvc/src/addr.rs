use std::net::SocketAddr;

/// A lazily resolved socket address.
///
/// Resolution happens on first access and is cached thereafter; a failed
/// lookup leaves the cache unresolved so a later access can retry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AddrCache {
    #[default]
    Unresolved,
    Resolved(SocketAddr),
}

impl AddrCache {
    pub fn get(&self) -> Option<SocketAddr> {
        match self {
            AddrCache::Resolved(addr) => Some(*addr),
            AddrCache::Unresolved => None,
        }
    }

    pub fn get_or_resolve(
        &mut self,
        resolve: impl FnOnce() -> std::io::Result<SocketAddr>,
    ) -> std::io::Result<SocketAddr> {
        if let AddrCache::Resolved(addr) = self {
            return Ok(*addr);
        }

        let addr = resolve()?;
        *self = AddrCache::Resolved(addr);
        Ok(addr)
    }
}
