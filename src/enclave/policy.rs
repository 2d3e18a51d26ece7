// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Frame-ancestors policy resolution.
//!
//! Each environment maps to an ordered list of [`Group`] templates. A group
//! expands to one or more CSP sources; the verified-domain template is
//! substituted with the project's verified origin. Sources are rendered in
//! table order, then the domain whitelist (non-prod only), then the project's
//! extra frame ancestors. Every table group keeps its slot, so a project
//! verified on `walletconnect.com` renders the WalletConnect group twice
//! outside prod. Configured entries already present are skipped.
//!
//! `*.host` does not match `host` itself in CSP, so host groups list both.

use tracing::warn;

use super::PolicyError;
use crate::{
    config::{Config, Environment},
    models::{Project, ProjectId},
    origin::{Origin, Scheme},
    registry::ProjectRegistry,
};

const WALLETCONNECT_DOMAIN: &str = "walletconnect.com";
const VERCEL_DOMAIN: &str = "vercel.app";
const LOCALHOST: &str = "localhost";

/// Source template within an environment's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    /// `https://*.walletconnect.com https://walletconnect.com`
    WalletConnect,
    /// Wildcard and exact form of the verified domain; skipped when absent.
    VerifiedDomain,
    /// Only the verified origin itself. Required.
    VerifiedOriginOnly,
    /// `https://*.vercel.app https://vercel.app`
    Vercel,
    /// `http://*.localhost http://localhost`
    Localhost,
}

fn groups(environment: Environment) -> &'static [Group] {
    match environment {
        Environment::Prod => &[Group::VerifiedOriginOnly],
        Environment::Staging | Environment::Dev | Environment::Local => &[
            Group::WalletConnect,
            Group::VerifiedDomain,
            Group::Vercel,
            Group::Localhost,
        ],
    }
}

/// Result of a policy lookup for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Serve with this `Content-Security-Policy` value.
    Csp(String),
    /// Verification is disabled for the project: serve without a policy.
    NoPolicy,
}

impl PolicyOutcome {
    pub fn header_value(&self) -> Option<&str> {
        match self {
            PolicyOutcome::Csp(value) => Some(value),
            PolicyOutcome::NoPolicy => None,
        }
    }
}

/// Environment-specific policy builder, fixed at startup.
#[derive(Debug, Clone)]
pub struct FrameAncestorsPolicy {
    environment: Environment,
    whitelist: Vec<String>,
}

impl FrameAncestorsPolicy {
    pub fn new(environment: Environment, whitelist: Vec<String>) -> Self {
        Self {
            environment,
            whitelist,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.environment, config.domain_whitelist.clone())
    }

    /// Validate the raw project ID, look the project up and build its policy.
    pub async fn resolve(
        &self,
        registry: &dyn ProjectRegistry,
        raw_project_id: &str,
    ) -> Result<PolicyOutcome, PolicyError> {
        let project_id = ProjectId::parse(raw_project_id)?;
        let project = registry
            .project_data(&project_id)
            .await?
            .ok_or(PolicyError::UnknownProject)?;

        self.build(&project)
    }

    pub fn build(&self, project: &Project) -> Result<PolicyOutcome, PolicyError> {
        if !project.verify_enabled {
            return Ok(PolicyOutcome::NoPolicy);
        }

        let verified = project.verified_domain.as_deref().and_then(|domain| {
            let parsed = Origin::parse(domain.trim().trim_start_matches("*."));
            if parsed.is_none() {
                warn!(
                    project_id = %project.id,
                    verified_domain = domain,
                    "Verified domain isn't a valid origin, ignoring it"
                );
            }
            parsed
        });

        let mut sources = Sources::default();
        for group in groups(self.environment) {
            match group {
                Group::WalletConnect => sources.host_group(Scheme::Https, WALLETCONNECT_DOMAIN, false),
                Group::VerifiedDomain => {
                    if let Some(origin) = &verified {
                        sources.host_group(origin.scheme, &origin.authority(), origin.is_ip());
                    }
                }
                Group::VerifiedOriginOnly => {
                    let origin = verified.as_ref().ok_or(PolicyError::NoVerifiedDomain)?;
                    if origin.is_within(WALLETCONNECT_DOMAIN) {
                        sources.push(format!("https://*.{WALLETCONNECT_DOMAIN}"));
                    } else {
                        sources.push(origin.to_string());
                    }
                }
                Group::Vercel => sources.host_group(Scheme::Https, VERCEL_DOMAIN, false),
                Group::Localhost => {
                    let scheme = verified
                        .as_ref()
                        .filter(|origin| origin.is_loopback())
                        .map_or(Scheme::Http, |origin| origin.scheme);
                    sources.host_group(scheme, LOCALHOST, false);
                }
            }
        }

        if !self.environment.is_prod() {
            for entry in &self.whitelist {
                sources.extra(entry, &project.id);
            }
        }
        for entry in &project.extra_frame_ancestors {
            sources.extra(entry, &project.id);
        }

        Ok(PolicyOutcome::Csp(sources.render()))
    }
}

/// Ordered list of CSP sources.
#[derive(Default)]
struct Sources(Vec<String>);

impl Sources {
    fn push(&mut self, source: String) {
        self.0.push(source);
    }

    fn host_group(&mut self, scheme: Scheme, authority: &str, is_ip: bool) {
        let scheme = scheme.as_str();
        if !is_ip {
            self.push(format!("{scheme}://*.{authority}"));
        }
        self.push(format!("{scheme}://{authority}"));
    }

    /// Append a configured source verbatim. Entries that would break out of
    /// the directive are dropped.
    fn extra(&mut self, entry: &str, project_id: &ProjectId) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        if entry.contains(|c: char| c == ';' || c == ',' || c.is_whitespace()) {
            warn!(%project_id, entry, "Skipping invalid frame ancestor");
            return;
        }
        if !self.0.iter().any(|source| source == entry) {
            self.push(entry.to_string());
        }
    }

    fn render(&self) -> String {
        std::iter::once("frame-ancestors")
            .chain(self.0.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticProjectRegistry;

    const PROJECT: &str = "a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8";

    const WC: &str = "https://*.walletconnect.com https://walletconnect.com";
    const VERCEL: &str = "https://*.vercel.app https://vercel.app";
    const LOCAL: &str = "http://*.localhost http://localhost";

    fn project(verified_domain: Option<&str>) -> Project {
        Project {
            id: ProjectId::parse(PROJECT).unwrap(),
            verified_domain: verified_domain.map(str::to_string),
            verify_enabled: true,
            extra_frame_ancestors: Vec::new(),
        }
    }

    fn csp(policy: &FrameAncestorsPolicy, project: &Project) -> String {
        match policy.build(project).unwrap() {
            PolicyOutcome::Csp(value) => value,
            PolicyOutcome::NoPolicy => panic!("expected a policy"),
        }
    }

    fn prod() -> FrameAncestorsPolicy {
        FrameAncestorsPolicy::new(Environment::Prod, Vec::new())
    }

    fn dev() -> FrameAncestorsPolicy {
        FrameAncestorsPolicy::new(Environment::Dev, Vec::new())
    }

    #[test]
    fn prod_walletconnect_domain() {
        let project = project(Some("https://walletconnect.com"));
        assert_eq!(csp(&prod(), &project), "frame-ancestors https://*.walletconnect.com");

        let sub = self::project(Some("https://app.walletconnect.com"));
        assert_eq!(csp(&prod(), &sub), "frame-ancestors https://*.walletconnect.com");
    }

    #[test]
    fn prod_other_domain_is_the_single_origin() {
        let project = project(Some("https://app.example.com"));
        assert_eq!(csp(&prod(), &project), "frame-ancestors https://app.example.com");

        let bare = self::project(Some("example.org"));
        assert_eq!(csp(&prod(), &bare), "frame-ancestors https://example.org");
    }

    #[test]
    fn prod_without_verified_domain_is_not_found() {
        let result = prod().build(&project(None));
        assert!(matches!(result, Err(PolicyError::NoVerifiedDomain)));

        let unparseable = prod().build(&project(Some("not a domain")));
        assert!(matches!(unparseable, Err(PolicyError::NoVerifiedDomain)));
    }

    #[test]
    fn non_prod_composite_in_table_order() {
        let project = project(Some("https://app.example.com"));
        assert_eq!(
            csp(&dev(), &project),
            format!(
                "frame-ancestors {WC} https://*.app.example.com https://app.example.com {VERCEL} {LOCAL}"
            )
        );

        let staging = FrameAncestorsPolicy::new(Environment::Staging, Vec::new());
        assert_eq!(csp(&staging, &project), csp(&dev(), &project));
    }

    #[test]
    fn non_prod_walletconnect_domain_duplicates_wc_group() {
        let project = project(Some("https://walletconnect.com"));
        let expected = format!("frame-ancestors {WC} {WC} {VERCEL} {LOCAL}");
        assert_eq!(csp(&dev(), &project), expected);

        let staging = FrameAncestorsPolicy::new(Environment::Staging, Vec::new());
        assert_eq!(csp(&staging, &project), expected);
    }

    #[test]
    fn extra_entries_skip_sources_already_listed() {
        let mut project = project(Some("https://walletconnect.com"));
        project.extra_frame_ancestors =
            vec!["https://vercel.app".into(), "https://x.example".into()];
        assert_eq!(
            csp(&dev(), &project),
            format!("frame-ancestors {WC} {WC} {VERCEL} {LOCAL} https://x.example")
        );
    }

    #[test]
    fn non_prod_without_verified_domain() {
        assert_eq!(
            csp(&dev(), &project(None)),
            format!("frame-ancestors {WC} {VERCEL} {LOCAL}")
        );
    }

    #[test]
    fn localhost_group_follows_loopback_verified_scheme() {
        let local = FrameAncestorsPolicy::new(Environment::Local, Vec::new());
        let project = project(Some("https://localhost:3000"));
        assert_eq!(
            csp(&local, &project),
            format!(
                "frame-ancestors {WC} https://*.localhost:3000 https://localhost:3000 {VERCEL} \
                 https://*.localhost https://localhost"
            )
        );
    }

    #[test]
    fn ip_verified_domain_has_no_wildcard() {
        let project = project(Some("http://127.0.0.1:8080"));
        assert_eq!(
            csp(&dev(), &project),
            format!("frame-ancestors {WC} http://127.0.0.1:8080 {VERCEL} {LOCAL}")
        );
    }

    #[test]
    fn extra_ancestors_are_appended_in_order() {
        let mut project = project(Some("https://walletconnect.com"));
        project.extra_frame_ancestors = vec![
            "https://b.example".into(),
            "https://a.example".into(),
            "https://b.example".into(),
            "https://evil.example; script-src *".into(),
        ];

        assert_eq!(
            csp(&prod(), &project),
            "frame-ancestors https://*.walletconnect.com https://b.example https://a.example"
        );
    }

    #[test]
    fn whitelist_applies_outside_prod_only() {
        let whitelist = vec!["https://preview.example".to_string()];
        let mut project = project(Some("https://walletconnect.com"));
        project.extra_frame_ancestors = vec!["https://extra.example".into()];

        let dev = FrameAncestorsPolicy::new(Environment::Dev, whitelist.clone());
        assert_eq!(
            csp(&dev, &project),
            format!(
                "frame-ancestors {WC} {WC} {VERCEL} {LOCAL} https://preview.example https://extra.example"
            )
        );

        let prod = FrameAncestorsPolicy::new(Environment::Prod, whitelist);
        assert_eq!(
            csp(&prod, &project),
            "frame-ancestors https://*.walletconnect.com https://extra.example"
        );
    }

    #[test]
    fn disabled_verification_has_no_policy() {
        let mut project = project(None);
        project.verify_enabled = false;
        assert_eq!(prod().build(&project).unwrap(), PolicyOutcome::NoPolicy);
        assert_eq!(dev().build(&project).unwrap(), PolicyOutcome::NoPolicy);
    }

    #[tokio::test]
    async fn resolve_validates_then_looks_up() {
        let registry = StaticProjectRegistry::new([project(Some("https://walletconnect.com"))]);

        for bad in ["", "zz", "A3B4C5D6E7F8A9B0C1D2E3F4A5B6C7D8", "a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8a"] {
            let result = prod().resolve(&registry, bad).await;
            assert!(matches!(result, Err(PolicyError::InvalidProjectId(_))), "{bad}");
        }

        let unknown = prod()
            .resolve(&registry, "00000000000000000000000000000000")
            .await;
        assert!(matches!(unknown, Err(PolicyError::UnknownProject)));

        let found = prod().resolve(&registry, PROJECT).await.unwrap();
        assert_eq!(
            found.header_value(),
            Some("frame-ancestors https://*.walletconnect.com")
        );
    }
}
