use serde::{Deserialize, Serialize};

/// Transport used to tunnel RPC and HTTP traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyKind {
    Http,
    Socks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Tunnel type selected by URL scheme (`socks4`, `socks5`, `socks5h` or HTTP(S)).
    pub fn kind(&self) -> ProxyKind {
        if self.url.to_ascii_lowercase().starts_with("socks") {
            ProxyKind::Socks
        } else {
            ProxyKind::Http
        }
    }

    /// URL safe for logs: credentials embedded in the URL are masked.
    pub fn display_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}***{}", &self.url[..scheme_end + 3], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }
}
