//! Registry conformance: contexts loaded from JSON and YAML behave like
//! contexts built in code.

#![cfg(feature = "registry")]

use std::sync::Arc;

use authctx::{
    AuthenticationConfiguration, AuthenticationContext, ConfigError, ContextConfig, MatchRule,
    MatchTarget, Registry, RegistryBuilder,
};
use authctx_test::{PlainSaslClientFactory, StaticCredentials};

fn registry() -> Registry {
    authctx_test::register(RegistryBuilder::new()).build()
}

fn target(uri: &str) -> MatchTarget {
    MatchTarget::parse(uri).unwrap()
}

#[test]
fn registry_lists_test_types() {
    let registry = registry();
    assert_eq!(registry.credential_type_urls(), vec!["authctx.test.v1.StaticPassword"]);
    assert_eq!(registry.ssl_type_urls(), vec!["authctx.test.v1.FixedSsl"]);
}

#[test]
fn loaded_context_matches_built_context() {
    let yaml = r"
rules:
  - match: { scheme: ldap }
    configuration: { name: A }
  - match: { domain: example.org, port: 443 }
    configuration: { name: B, port: 8443 }
  - configuration: { name: anonymous }
";
    let config: ContextConfig = serde_yaml::from_str(yaml).unwrap();
    let loaded = registry().load_context(config).unwrap();

    let built = AuthenticationContext::empty()
        .with(
            MatchRule::ALL.match_scheme("ldap"),
            AuthenticationConfiguration::empty().use_name("A"),
        )
        .with(
            MatchRule::ALL.match_domain("example.org").match_port(443),
            AuthenticationConfiguration::empty().use_name("B").use_port(8443),
        )
        .with(
            MatchRule::ALL,
            AuthenticationConfiguration::empty().use_name("anonymous"),
        );

    assert_eq!(loaded, built);
    for uri in [
        "ldap://example.org/",
        "https://www.example.org/",
        "https://www.example.org:8443/",
        "urn:x",
    ] {
        let t = target(uri);
        assert_eq!(loaded.rule_matching(&t), built.rule_matching(&t), "{uri}");
    }
}

#[test]
fn json_and_yaml_agree() {
    let json = serde_json::json!({
        "rules": [{
            "match": { "host_pattern": "^ds[0-9]+\\.example\\.org$" },
            "configuration": { "name": "pattern", "sasl": { "allow": ["PLAIN"] } }
        }]
    });
    let yaml = r#"
rules:
  - match: { host_pattern: '^ds[0-9]+\.example\.org$' }
    configuration: { name: pattern, sasl: { allow: [PLAIN] } }
"#;
    let from_json = registry()
        .load_context(serde_json::from_value(json).unwrap())
        .unwrap();
    let from_yaml = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap();
    assert_eq!(from_json, from_yaml);
}

#[test]
fn loaded_credentials_drive_plain() {
    let yaml = r"
rules:
  - match: { scheme: ldap }
    configuration:
      name: alice
      credentials: { type_url: authctx.test.v1.StaticPassword, config: { password: s3cret } }
";
    let ctx = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap();
    let uri = url::Url::parse("ldap://ds.example.org/").unwrap();
    let cfg = ctx.resolve(&MatchTarget::new(uri.clone()));

    let mut client = cfg
        .create_sasl_client(&uri, &PlainSaslClientFactory, &["PLAIN"])
        .unwrap()
        .unwrap();
    assert_eq!(client.evaluate_challenge(&[]).unwrap(), b"\0alice\0s3cret");
}

#[test]
fn loaded_ssl_factory_creates_contexts() {
    let yaml = r"
rules:
  - configuration:
      ssl: { type_url: authctx.test.v1.FixedSsl, config: { protocol: TLSv1.2 } }
";
    let ctx = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap();
    let cfg = ctx.resolve(&target("ldaps://example.org/"));
    assert_eq!(cfg.create_ssl_context().unwrap().protocol(), "TLSv1.2");
}

#[test]
fn unknown_ssl_type_lists_registered() {
    let yaml = r"
rules:
  - configuration:
      ssl: { type_url: authctx.test.v1.Missing }
";
    let err = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTypeUrl { registry: "ssl", .. }));
    assert!(err.to_string().contains("authctx.test.v1.FixedSsl"));
}

#[test]
fn unknown_field_in_collaborator_config_is_rejected() {
    let yaml = r"
rules:
  - configuration:
      credentials: { type_url: authctx.test.v1.StaticPassword, config: { passwd: x } }
";
    let err = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig { .. }));
}

#[test]
fn loaded_and_built_collaborators_are_distinct() {
    let yaml = r"
rules:
  - configuration:
      credentials: { type_url: authctx.test.v1.StaticPassword, config: { password: x } }
";
    let loaded = registry()
        .load_context(serde_yaml::from_str(yaml).unwrap())
        .unwrap();
    let built = AuthenticationContext::empty().with(
        MatchRule::ALL,
        AuthenticationConfiguration::empty()
            .use_credentials(Arc::new(StaticCredentials::password("x"))),
    );
    // Collaborators compare by identity, not by contents.
    assert_ne!(loaded, built);
}
