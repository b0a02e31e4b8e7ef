//! authctx CLI — driving adapter for authctx rule files.
//!
//! Subcommands:
//! - `resolve <config> <uri> [--protocol P] [--abstract-type T[@A]] [--trace] [--json]`
//!   — show which rule and configuration a URI resolves to
//! - `check <config>` — validate config loads without errors
//! - `info` — print registered type URLs
//!
//! Log output goes to stderr, filtered by `RUST_LOG` (default `warn`).

use std::process;

use authctx::{AuthenticationConfiguration, AuthenticationContext, ContextConfig, MatchTarget};
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "resolve" => cmd_resolve(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "info" => cmd_info(),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_resolve(args: &[String]) -> Result<(), String> {
    let [config_path, uri, rest @ ..] = args else {
        return Err("resolve requires a config file path and a URI".into());
    };

    let options = parse_resolve_options(rest)?;
    let ctx = load_context(config_path)?;
    let target = options.target(uri)?;

    if options.trace {
        let trace = ctx.rule_matching_with_trace(&target);
        if options.json {
            let json = serde_json::to_string_pretty(&trace)
                .map_err(|e| format!("JSON encode error: {e}"))?;
            println!("{json}");
        } else {
            println!("{trace}");
        }
        return Ok(());
    }

    let index = ctx.rule_matching(&target);
    let resolved = ctx.resolve(&target);
    if options.json {
        let json = serde_json::to_string_pretty(&summary(index, &resolved, &target))
            .map_err(|e| format!("JSON encode error: {e}"))?;
        println!("{json}");
    } else {
        print_summary(index, &resolved, &target);
    }

    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    let Some(config_path) = args.first() else {
        return Err("check requires a config file path".into());
    };

    let ctx = load_context(config_path)?;

    println!("Config valid ({} rules)", ctx.len());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Uniform return type for all commands
fn cmd_info() -> Result<(), String> {
    let registry = build_registry();

    println!("Registered credential sources:");
    for url in registry.credential_type_urls() {
        println!("  {url}");
    }

    println!("\nRegistered SSL context factories:");
    for url in registry.ssl_type_urls() {
        println!("  {url}");
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════════════════════════

fn summary(
    index: Option<usize>,
    resolved: &AuthenticationConfiguration,
    target: &MatchTarget,
) -> serde_json::Value {
    let uri = target.uri();
    serde_json::json!({
        "rule": index,
        "name": resolved.principal().map(|p| p.name()),
        "authorization_name": resolved.authorization_name(),
        "realm": resolved.realm(),
        "host": resolved.host_for(uri),
        "port": resolved.port_for(uri),
        "protocol": resolved.protocol_for(uri),
        "credentials": resolved.credentials().is_some(),
        "ssl": resolved.ssl_context_factory().is_some(),
    })
}

fn print_summary(index: Option<usize>, resolved: &AuthenticationConfiguration, target: &MatchTarget) {
    let uri = target.uri();
    match index {
        Some(i) => println!("rule:     {i}"),
        None => println!("rule:     (no match)"),
    }
    if let Some(principal) = resolved.principal() {
        println!("name:     {principal}");
    }
    if let Some(authz) = resolved.authorization_name() {
        println!("authz:    {authz}");
    }
    if let Some(realm) = resolved.realm() {
        println!("realm:    {realm}");
    }
    if let Some(host) = resolved.host_for(uri) {
        println!("host:     {host}");
    }
    if let Some(port) = resolved.port_for(uri) {
        println!("port:     {port}");
    }
    println!("protocol: {}", resolved.protocol_for(uri));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

fn build_registry() -> authctx::Registry {
    let builder = authctx::RegistryBuilder::new();
    authctx_test::register(builder).build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(path: &str) -> Result<ContextConfig, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error: {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error: {e}"))
    }
}

fn load_context(path: &str) -> Result<AuthenticationContext, String> {
    let config = load_config(path)?;
    build_registry()
        .load_context(config)
        .map_err(|e| format!("config invalid: {e}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, PartialEq, Eq)]
struct ResolveOptions {
    protocol: Option<String>,
    abstract_type: Option<(String, Option<String>)>,
    trace: bool,
    json: bool,
}

impl ResolveOptions {
    fn target(&self, uri: &str) -> Result<MatchTarget, String> {
        let mut target = MatchTarget::parse(uri).map_err(|e| e.to_string())?;
        if let Some(protocol) = &self.protocol {
            target = target.with_protocol(protocol.clone());
        }
        if let Some((abstract_type, authority)) = &self.abstract_type {
            target = target.with_abstract_type(abstract_type.clone(), authority.as_deref());
        }
        Ok(target)
    }
}

fn parse_resolve_options(args: &[String]) -> Result<ResolveOptions, String> {
    let mut options = ResolveOptions::default();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--protocol" => {
                let value = args.next().ok_or("--protocol requires a value")?;
                options.protocol = Some(value.clone());
            }
            "--abstract-type" => {
                let value = args.next().ok_or("--abstract-type requires a value")?;
                options.abstract_type = Some(match value.split_once('@') {
                    Some((t, a)) => (t.to_owned(), Some(a.to_owned())),
                    None => (value.clone(), None),
                });
            }
            "--trace" => options.trace = true,
            "--json" => options.json = true,
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
    }

    Ok(options)
}

fn print_usage() {
    eprintln!(
        "Usage: authctx <command> [options]

Commands:
  resolve <config> <uri> [options]   Show the rule and configuration a URI resolves to
      --protocol <name>              Protocol tag (defaults to the URI scheme)
      --abstract-type <type[@auth]>  Abstract type and optional authority
      --trace                        Show every rule tried
      --json                         JSON output
  check <config>                     Validate config
  info                               Print registered type URLs
  help                               Show this help

Set RUST_LOG (e.g. RUST_LOG=authctx=debug) to see resolution logs on stderr."
    );
}
