//! Purpose: `steein` CLI entry point for querying and decoding Steein API responses.
//! Role: Binary crate root; parses args, loads config, runs commands, emits JSON on stdout.
//! Invariants: Successful commands print `{"kind": .., "value": ..}` envelopes on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use steein::api::{
    Client, Config, Error, ErrorKind, FieldValue, Method, RawResponse, Response, SubtypeRegistry,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `steein --help`."));
            }
        },
    };

    init_tracing();
    let globals = GlobalArgs {
        config: cli.config,
        token: cli.token,
        api_version: cli.api_version,
        base_url: cli.base_url,
    };
    command_dispatch::dispatch_command(cli.command, globals).map_err(add_api_hint)
}

#[derive(Parser)]
#[command(
    name = "steein",
    version,
    about = "Query the Steein social-graph API",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Responses are cast into graph nodes and edges, then printed as JSON.

Mental model:
  - `get`, `post`, `delete` call an endpoint with your access token
  - `decode` casts a saved response body offline (no network)
  - API errors are classified (authentication, throttle, ...) and exit non-zero
"#,
    after_help = r#"EXAMPLES
  $ steein --token "$TOKEN" get /me --subtype user
  $ steein get /me/posts -p limit=10 --pages 3
  $ steein post /me/feed -p message="hello world"
  $ echo '{"data":[{"id":1}]}' | steein decode

CONFIGURATION
  --config <file> reads a JSON object with client_id, client_secret,
  default_api_version, default_access_token, base_url, timeout_secs.
  STEEIN_CLIENT_ID, STEEIN_CLIENT_SECRET, STEEIN_API_VERSION,
  STEEIN_ACCESS_TOKEN, STEEIN_BASE_URL, STEEIN_TIMEOUT_SECS override the file.
  RUST_LOG=debug logs requests and casting decisions to stderr.

LEARN MORE
  $ steein <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON config file (client_id, client_secret, ...)",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Access token (overrides STEEIN_ACCESS_TOKEN)")]
    token: Option<String>,
    #[arg(long = "api-version", global = true, help = "API version, e.g. v1")]
    api_version: Option<String>,
    #[arg(
        long = "base-url",
        global = true,
        help = "API origin (default: https://www.steein.ru)",
        value_hint = ValueHint::Url
    )]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

struct GlobalArgs {
    config: Option<PathBuf>,
    token: Option<String>,
    api_version: Option<String>,
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Fetch an endpoint and print the cast graph",
        long_about = r#"Send a GET request and print the response as a node or an edge.

List responses can be followed page by page with --pages; each page is
printed as its own JSON document."#,
        after_help = r#"EXAMPLES
  $ steein get /me --subtype user
  $ steein get /me/friends -p limit=50 --pages 5
  $ steein get /me --etag '"5f3a"'"#
    )]
    Get {
        #[arg(help = "Endpoint path, e.g. /me/posts")]
        endpoint: String,
        #[arg(
            short = 'p',
            long = "param",
            value_name = "KEY=VALUE",
            value_parser = parse_param,
            help = "Request parameter (repeatable)"
        )]
        params: Vec<(String, String)>,
        #[arg(long, help = "Subtype to cast nodes as (user, media, post_media)")]
        subtype: Option<String>,
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Follow `next` links up to this many pages"
        )]
        pages: u32,
        #[arg(long, help = "Send If-None-Match with this ETag")]
        etag: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "POST to an endpoint",
        after_help = r#"EXAMPLES
  $ steein post /me/feed -p message="hello world""#
    )]
    Post {
        #[arg(help = "Endpoint path, e.g. /me/feed")]
        endpoint: String,
        #[arg(
            short = 'p',
            long = "param",
            value_name = "KEY=VALUE",
            value_parser = parse_param,
            help = "Form parameter (repeatable)"
        )]
        params: Vec<(String, String)>,
        #[arg(long, help = "Subtype to cast the reply as")]
        subtype: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "DELETE an endpoint",
        after_help = r#"EXAMPLES
  $ steein delete /12345"#
    )]
    Delete {
        #[arg(help = "Endpoint path, e.g. /12345")]
        endpoint: String,
        #[arg(
            short = 'p',
            long = "param",
            value_name = "KEY=VALUE",
            value_parser = parse_param,
            help = "Request parameter (repeatable)"
        )]
        params: Vec<(String, String)>,
    },
    #[command(
        about = "Cast a raw response body read from stdin",
        long_about = r#"Read a raw response body from stdin and cast it offline.

Bodies that are not JSON are read as form-encoded key/value pairs.
Error payloads are classified and reported like live API errors."#,
        after_help = r#"EXAMPLES
  $ echo '{"data":{"id":"1","username":"ada"}}' | steein decode --subtype user
  $ echo '{"error":{"code":4,"message":"slow down"}}' | steein decode --status 400"#
    )]
    Decode {
        #[arg(long, help = "Subtype to cast nodes as")]
        subtype: Option<String>,
        #[arg(long, default_value_t = 200, help = "HTTP status to attach to the body")]
        status: u16,
    },
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ steein completion bash > ~/.local/share/bash-completion/completions/steein
  $ steein completion zsh > ~/.zfunc/_steein
  $ steein completion fish > ~/.config/fish/completions/steein.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(globals: &GlobalArgs) -> Result<Config, Error> {
    let mut config = match &globals.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    }
    .merge_env()?;
    if let Some(token) = &globals.token {
        config.default_access_token = Some(token.clone());
    }
    if let Some(version) = &globals.api_version {
        config.default_api_version = version.clone();
    }
    if let Some(base_url) = &globals.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

fn build_client(globals: &GlobalArgs) -> Result<Client, Error> {
    Client::new(load_config(globals)?)
}

fn read_stdin() -> Result<String, Error> {
    let mut body = String::new();
    io::stdin().read_to_string(&mut body).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read stdin")
            .with_source(err)
    })?;
    Ok(body)
}

fn decode_offline(body: String, status: u16) -> Response {
    Response::new(
        None,
        RawResponse::new(status, body),
        Arc::new(SubtypeRegistry::builtin()),
    )
}

fn graph_json(response: &Response, subtype: Option<&str>) -> Result<Value, Error> {
    let value = match response.graph_object(subtype)? {
        FieldValue::Node(node) => json!({ "kind": "node", "value": node.to_json() }),
        FieldValue::Edge(edge) => json!({ "kind": "edge", "value": edge.to_json() }),
        other => json!({ "kind": "value", "value": other.to_json() }),
    };
    Ok(value)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::InvalidSubtype => "invalid subtype".to_string(),
        ErrorKind::InvalidOperation => "invalid operation".to_string(),
        ErrorKind::Malformed => "malformed response".to_string(),
        ErrorKind::Api => "api error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(endpoint) = err.endpoint() {
        inner.insert("endpoint".to_string(), json!(endpoint));
    }
    if let Some(subtype) = err.subtype() {
        inner.insert("subtype".to_string(), json!(subtype));
    }
    if let Some(api) = err.api_error() {
        inner.insert(
            "api".to_string(),
            json!({
                "kind": format!("{:?}", api.kind()),
                "code": api.code(),
                "subcode": api.subcode(),
                "type": api.error_type(),
                "status": api.http_status(),
            }),
        );
    }
    let causes = error_causes(err);
    if err.api_error().is_none() && !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(api) = err.api_error() {
        let code = api
            .code()
            .map(|code| format!(" code {code}"))
            .unwrap_or_default();
        lines.push(format!("api: {:?}{code}", api.kind()));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(endpoint) = err.endpoint() {
        lines.push(format!("endpoint: {endpoint}"));
    }
    if err.api_error().is_none() {
        if let Some(cause) = error_causes(err).first() {
            lines.push(format!("caused by: {cause}"));
        }
    }
    lines.join("\n")
}

fn add_api_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    let hint = match err.api_error().map(|api| api.kind()) {
        Some(steein::api::ApiErrorKind::Authentication) => {
            "The access token was rejected; request a new one."
        }
        Some(steein::api::ApiErrorKind::Authorization) => {
            "The token lacks a permission this endpoint needs."
        }
        Some(steein::api::ApiErrorKind::Throttle) => "Rate limited; retry later.",
        _ => return err,
    };
    err.with_hint(hint)
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
