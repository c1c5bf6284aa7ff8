use crate::app::status::render_status;
use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result, bail};
use lockgate::config::Config;
use lockgate::core::{Decision, Request, Validator};
use lockgate::error::SigningError;
use lockgate::security::{SigningKey, TokenVerifier, load_signing_key};
use lockgate::transport::gateway::run_gateway;
use serde_json::{Value, json};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

const EXIT_QUARANTINE: u8 = 2;
const EXIT_REJECT: u8 = 3;
const EXIT_INVALID_TOKEN: u8 = 1;

/// Load the signing key; an unreadable key is downgraded to "no key" so
/// issuance fails per request with a retryable error instead of at startup.
fn signing_key(config: &Config) -> Result<Option<SigningKey>> {
    match load_signing_key(&config.signing) {
        Ok(key) => Ok(key),
        Err(SigningError::KeyUnavailable(reason)) => {
            tracing::warn!("signing key unavailable: {reason}");
            Ok(None)
        }
        Err(e) => Err(e).context("load signing key"),
    }
}

fn build_validator(config: &Config) -> Result<Validator> {
    let key = signing_key(config)?;
    if key.is_none() {
        tracing::warn!("no signing key configured; LOCKED decisions cannot be issued");
    }
    Validator::from_config(config, key).context("build validator from config")
}

fn exit_code_for(decision: &Decision) -> ExitCode {
    match decision {
        Decision::Locked { .. } => ExitCode::SUCCESS,
        Decision::Quarantine { .. } => ExitCode::from(EXIT_QUARANTINE),
        Decision::Reject { .. } => ExitCode::from(EXIT_REJECT),
    }
}

/// `--payload` text: JSON if it parses, otherwise a plain string.
fn parse_inline_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn read_request(source: &str) -> Result<Request> {
    if source == "-" {
        return read_request_from(tokio::io::stdin()).await;
    }
    let contents = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("read request file {source}"))?;
    serde_json::from_str(&contents).context("parse request JSON")
}

async fn read_request_from<R: AsyncRead + Unpin>(mut reader: R) -> Result<Request> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .await
        .context("read request from stdin")?;
    serde_json::from_str(&contents).context("parse request JSON")
}

async fn run_validate(
    config: &Config,
    request: Option<String>,
    id: Option<String>,
    policy: String,
    payload: Option<String>,
    trace: bool,
) -> Result<ExitCode> {
    let request = match (request, id, payload) {
        (Some(source), _, _) => read_request(&source).await?,
        (None, Some(id), Some(payload)) => Request::new(id, parse_inline_payload(&payload), policy),
        _ => bail!("provide --request FILE|- or both --id and --payload"),
    };

    let validator = build_validator(config)?;
    let validation = match validator.validate(request).await {
        Ok(validation) => validation,
        Err(e) if e.is_retryable() => {
            return Err(anyhow::Error::new(e).context("validation could not complete (retryable)"));
        }
        Err(e) => return Err(e.into()),
    };

    let output = if trace {
        json!({ "decision": validation.decision, "results": validation.results })
    } else {
        serde_json::to_value(&validation.decision).context("serialize decision")?
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("render decision")?
    );

    Ok(exit_code_for(&validation.decision))
}

fn run_verify(config: &Config, token: &str) -> Result<ExitCode> {
    let Some(key) = signing_key(config)? else {
        bail!("no signing key configured; cannot verify tokens");
    };
    let verifier = TokenVerifier::new(Arc::new(key));

    let (output, code) = match verifier.verify_compact(token.trim()) {
        Ok(token) => (
            json!({
                "valid": true,
                "subject": token.subject,
                "policy_version": token.policy_version,
                "expires_at": token.expires_at,
            }),
            ExitCode::SUCCESS,
        ),
        Err(e) => (
            json!({ "valid": false, "reason": e.to_string() }),
            ExitCode::from(EXIT_INVALID_TOKEN),
        ),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("render verification result")?
    );
    Ok(code)
}

fn print_policies(config: &Config) -> Result<()> {
    let validator = Validator::from_config(config, None).context("build policy table")?;
    for policy in validator.policies() {
        println!("{} (ttl {}s)", policy.version, policy.ttl_secs);
        for rule in policy.rules {
            println!("  - {} [{}]", rule.name, rule.severity);
        }
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<ExitCode> {
    match cli.command {
        Commands::Init => {
            if config.freshly_created {
                println!("Wrote default config to {}", config.config_path.display());
            } else {
                println!("Config ready at {}", config.config_path.display());
            }
            println!(
                "Next: `lockgate keygen` or set {} to provide a signing key.",
                config.signing.key_env
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Keygen => {
            println!("{}", SigningKey::generate().to_hex());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Policies => {
            print_policies(&config)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate {
            request,
            id,
            policy,
            payload,
            trace,
        } => run_validate(&config, request, id, policy, payload, trace).await,

        Commands::Verify { token } => run_verify(&config, &token),

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            if port == 0 {
                info!("Starting lockgate gateway on {host} (random port)");
            } else {
                info!("Starting lockgate gateway on {host}:{port}");
            }
            let validator = build_validator(&config)?;
            run_gateway(&host, port, &config.gateway, validator).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
