//! Conformance test fixture runner
//!
//! Loads YAML fixtures, compiles their context through the registry, and checks
//! which rule every case resolves to.
//!
//! ```yaml
//! name: first_match_wins
//! description: Earlier rules shadow later ones
//! context:
//!   rules:
//!     - match: { scheme: ldap }
//!       configuration: { name: A }
//!     - match: { host: example.org }
//!       configuration: { name: B }
//! cases:
//!   - name: scheme rule first
//!     uri: ldap://example.org/
//!     expect: { rule: 0, name: A }
//!   - name: nothing matches
//!     uri: https://other.test/
//!     expect: { empty: true }
//! ```

use authctx::{AuthenticationConfiguration, ContextConfig, MatchTarget, Registry};
use serde::Deserialize;

/// A complete test fixture.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub context: ContextConfig,
    /// If set, loading the context must fail with a message containing this text.
    #[serde(default)]
    pub load_error: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// One resolution to check.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub abstract_type: Option<String>,
    #[serde(default)]
    pub abstract_type_authority: Option<String>,
    pub expect: Expectation,
}

/// Expected outcome. Only the fields that are present are checked.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// Index of the matching rule. Omitted means "no rule matches".
    #[serde(default)]
    pub rule: Option<usize>,
    /// The resolved configuration is the empty one.
    #[serde(default)]
    pub empty: bool,
    pub name: Option<String>,
    pub realm: Option<String>,
    /// Destination host after rewrites.
    pub host: Option<String>,
    /// Destination port after rewrites, falling back to the scheme default.
    pub port: Option<u16>,
    pub sasl_allowed: Option<Vec<String>>,
    pub sasl_forbidden: Option<Vec<String>>,
}

/// Outcome of one case.
#[derive(Debug)]
pub struct CaseResult {
    pub fixture: String,
    pub case: String,
    pub failures: Vec<String>,
}

impl CaseResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Fixture {
    /// Parse a single fixture.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the document does not describe a fixture.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse every fixture in a multi-document YAML stream (separated by `---`).
    ///
    /// # Errors
    ///
    /// Returns the first document's YAML error.
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        serde_yaml::Deserializer::from_str(yaml)
            .map(Self::deserialize)
            .collect()
    }

    /// Run every case against a context loaded through `registry`.
    #[must_use]
    pub fn run(&self, registry: &Registry) -> Vec<CaseResult> {
        let loaded = registry.load_context(self.context.clone());

        if let Some(expected) = &self.load_error {
            let failures = match loaded {
                Ok(_) => vec![format!("expected load error containing \"{expected}\", but loaded")],
                Err(e) if e.to_string().contains(expected.as_str()) => vec![],
                Err(e) => vec![format!("expected load error containing \"{expected}\", got \"{e}\"")],
            };
            return vec![self.result("(load)", failures)];
        }

        let ctx = match loaded {
            Ok(ctx) => ctx,
            Err(e) => return vec![self.result("(load)", vec![format!("load failed: {e}")])],
        };

        self.cases
            .iter()
            .map(|case| {
                let failures = match case.target() {
                    Ok(target) => {
                        let index = ctx.rule_matching(&target);
                        check(&case.expect, &target, index, &ctx.resolve(&target))
                    }
                    Err(e) => vec![e.to_string()],
                };
                self.result(&case.name, failures)
            })
            .collect()
    }

    /// Run with the test registry and panic on the first failing case.
    ///
    /// # Panics
    ///
    /// Panics with every failure of the first failing case.
    pub fn run_and_assert(&self) {
        let registry = crate::register(authctx::RegistryBuilder::new()).build();
        for result in self.run(&registry) {
            assert!(
                result.passed(),
                "fixture \"{}\" case \"{}\" failed:\n  {}",
                result.fixture,
                result.case,
                result.failures.join("\n  ")
            );
        }
    }

    fn result(&self, case: &str, failures: Vec<String>) -> CaseResult {
        CaseResult {
            fixture: self.name.clone(),
            case: case.to_owned(),
            failures,
        }
    }
}

impl TestCase {
    fn target(&self) -> Result<MatchTarget, authctx::ConfigError> {
        let mut target = MatchTarget::parse(&self.uri)?;
        if let Some(protocol) = &self.protocol {
            target = target.with_protocol(protocol.clone());
        }
        if let Some(abstract_type) = &self.abstract_type {
            target = target
                .with_abstract_type(abstract_type.clone(), self.abstract_type_authority.as_deref());
        }
        Ok(target)
    }
}

fn check(
    expect: &Expectation,
    target: &MatchTarget,
    index: Option<usize>,
    resolved: &AuthenticationConfiguration,
) -> Vec<String> {
    let mut failures = Vec::new();

    if index != expect.rule {
        failures.push(format!("rule: expected {:?}, got {index:?}", expect.rule));
    }
    if expect.empty && !resolved.is_empty() {
        failures.push(format!("expected the empty configuration, got {resolved:?}"));
    }
    let name = resolved.principal().map(|p| p.name());
    if expect.name.is_some() && expect.name.as_deref() != name {
        failures.push(format!("name: expected {:?}, got {name:?}", expect.name));
    }
    if expect.realm.is_some() && expect.realm.as_deref() != resolved.realm() {
        failures.push(format!(
            "realm: expected {:?}, got {:?}",
            expect.realm,
            resolved.realm()
        ));
    }

    let host = resolved.host_for(target.uri());
    if expect.host.is_some() && expect.host.as_deref() != host {
        failures.push(format!("host: expected {:?}, got {host:?}", expect.host));
    }
    let port = resolved.port_for(target.uri());
    if expect.port.is_some() && expect.port != port {
        failures.push(format!("port: expected {:?}, got {port:?}", expect.port));
    }

    if let Some(allowed) = &expect.sasl_allowed {
        for mechanism in allowed {
            if !resolved.is_sasl_mechanism_allowed(mechanism) {
                failures.push(format!("sasl: expected {mechanism} to be allowed"));
            }
        }
    }
    if let Some(forbidden) = &expect.sasl_forbidden {
        for mechanism in forbidden {
            if resolved.is_sasl_mechanism_allowed(mechanism) {
                failures.push(format!("sasl: expected {mechanism} to be forbidden"));
            }
        }
    }

    failures
}
