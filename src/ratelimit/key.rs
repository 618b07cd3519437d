//! Rate limit key composition and client identity.

/// Sentinel identity used when no client address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A key that identifies one (client, theme) throttling bucket.
///
/// Rendered as `{client}:{author}/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// Client network identity
    pub client: String,
    /// Theme author
    pub author: String,
    /// Theme slug
    pub slug: String,
}

impl RateLimitKey {
    /// Create a new key for a client acting on a theme.
    pub fn new(client: &str, author: &str, slug: &str) -> Self {
        Self {
            client: client.to_string(),
            author: author.to_string(),
            slug: slug.to_string(),
        }
    }

    /// The string form used by the limiter's store.
    pub fn to_string_key(&self) -> String {
        format!("{}:{}/{}", self.client, self.author, self.slug)
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_key())
    }
}

/// Client address headers as received by the request layer.
#[derive(Debug, Clone, Default)]
pub struct ClientHeaders {
    /// Value of `x-forwarded-for`
    pub forwarded_for: Option<String>,
    /// Value of `x-real-ip`
    pub real_ip: Option<String>,
}

impl ClientHeaders {
    /// Headers carrying only a forwarded-for chain.
    pub fn forwarded(forwarded_for: &str) -> Self {
        Self {
            forwarded_for: Some(forwarded_for.to_string()),
            real_ip: None,
        }
    }

    /// Resolve the client identity from these headers.
    pub fn identity(&self) -> String {
        client_identity(self.forwarded_for.as_deref(), self.real_ip.as_deref())
    }
}

/// Derive the client identity from forwarding headers.
///
/// Uses the first entry of `x-forwarded-for`, then `x-real-ip`, then
/// [`UNKNOWN_CLIENT`]. Empty header values count as absent.
pub fn client_identity(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
    if let Some(forwarded) = forwarded_for.filter(|v| !v.is_empty()) {
        let first = forwarded.split(',').next().unwrap_or_default();
        return first.trim().to_string();
    }

    if let Some(real_ip) = real_ip.filter(|v| !v.is_empty()) {
        return real_ip.to_string();
    }

    UNKNOWN_CLIENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_string() {
        let key = RateLimitKey::new("10.0.0.1", "alice", "tokyo-night");
        assert_eq!(key.to_string_key(), "10.0.0.1:alice/tokyo-night");
        assert_eq!(key.to_string(), "10.0.0.1:alice/tokyo-night");
    }

    #[test]
    fn test_key_equality() {
        let key1 = RateLimitKey::new("ip1", "alice", "theme");
        let key2 = RateLimitKey::new("ip1", "alice", "theme");
        let key3 = RateLimitKey::new("ip2", "alice", "theme");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let ip = client_identity(Some(" 203.0.113.7 , 10.0.0.2, 10.0.0.3"), Some("192.0.2.1"));
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        assert_eq!(client_identity(None, Some("192.0.2.1")), "192.0.2.1");
        assert_eq!(client_identity(Some(""), Some("192.0.2.1")), "192.0.2.1");
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(client_identity(None, None), UNKNOWN_CLIENT);
        assert_eq!(ClientHeaders::default().identity(), "unknown");
    }

    #[test]
    fn test_client_headers_identity() {
        let headers = ClientHeaders::forwarded("198.51.100.4");
        assert_eq!(headers.identity(), "198.51.100.4");
    }
}
