// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parsing of origin strings.
//!
//! Origins reach the service in two shapes: full `scheme://host[:port]`
//! strings and bare hostnames such as `localhost` or `app.example.com`. Bare
//! hostnames are treated as `https`.

use std::fmt;

use url::{Host, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Scheme, host and optional explicit port of a web origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: Scheme,
    /// Lowercase host; IPv6 literals keep their brackets
    pub host: String,
    pub port: Option<u16>,
    is_ip: bool,
}

impl Origin {
    /// Parse an origin or bare hostname. Returns `None` for anything that is
    /// not an http(s) origin with a host.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let url = if raw.contains("://") {
            Url::parse(raw).ok()?
        } else {
            Url::parse(&format!("https://{raw}")).ok()?
        };

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return None,
        };

        let (host, is_ip) = match url.host()? {
            Host::Domain(domain) => (domain.to_ascii_lowercase(), false),
            Host::Ipv4(ip) => (ip.to_string(), true),
            Host::Ipv6(ip) => (format!("[{ip}]"), true),
        };

        Some(Self {
            scheme,
            host,
            port: url.port(),
            is_ip,
        })
    }

    pub fn is_ip(&self) -> bool {
        self.is_ip
    }

    /// `localhost`, `*.localhost`, or a loopback IP.
    pub fn is_loopback(&self) -> bool {
        self.host == "localhost"
            || self.host.ends_with(".localhost")
            || self.host.starts_with("127.")
            || self.host == "[::1]"
    }

    /// Whether the host is `domain` itself or one of its subdomains.
    pub fn is_within(&self, domain: &str) -> bool {
        let domain = domain.trim_start_matches("*.").to_ascii_lowercase();
        self.host == domain
            || self
                .host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// `host[:port]`
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())
    }
}
