//! Source-address resolution for rate limiting.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Extractor resolving the client address behind a reverse proxy.
///
/// Trust order: `x-forwarded-for` (first hop), then `x-real-ip`, then the
/// peer address from the accepted connection. Falls back to the unspecified
/// address so the extractor never rejects; all unidentifiable clients then
/// share one rate-limit bucket.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts)))
    }
}

fn resolve(parts: &Parts) -> IpAddr {
    if let Some(ip) = header_ip(parts, "x-forwarded-for") {
        return ip;
    }
    if let Some(ip) = header_ip(parts, "x-real-ip") {
        return ip;
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn header_ip(parts: &Parts, name: &str) -> Option<IpAddr> {
    parts
        .headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(build: impl FnOnce(axum::http::request::Builder) -> axum::http::request::Builder) -> Parts {
        let (parts, ()) = build(Request::builder()).body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let parts = parts(|b| b.header("x-forwarded-for", "203.0.113.7, 10.0.0.1"));
        assert_eq!(resolve(&parts), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn real_ip_is_the_second_choice() {
        let parts = parts(|b| b.header("x-real-ip", "198.51.100.4"));
        assert_eq!(resolve(&parts), "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn peer_address_backs_up_the_headers() {
        let mut parts = parts(|b| b);
        parts
            .extensions
            .insert(ConnectInfo("192.0.2.9:4242".parse::<SocketAddr>().unwrap()));
        assert_eq!(resolve(&parts), "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn garbage_headers_fall_through() {
        let parts = parts(|b| b.header("x-forwarded-for", "not-an-ip"));
        assert_eq!(resolve(&parts), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
