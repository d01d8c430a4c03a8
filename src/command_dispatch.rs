//! Purpose: Hold top-level CLI command dispatch for `steein`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command prints JSON envelopes built by `graph_json`.
//! Invariants: Helpers in `main.rs` remain the source of config and output logic.

use super::*;

pub(super) fn dispatch_command(command: Command, globals: GlobalArgs) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "steein", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Get {
            endpoint,
            params,
            subtype,
            pages,
            etag,
        } => {
            let client = build_client(&globals)?;
            let mut request = client.request(Method::Get, &endpoint, params)?;
            if let Some(etag) = etag {
                request = request.with_etag(etag);
            }
            let mut response = client.send(request)?;
            for page in 1..=pages {
                emit_json(graph_json(&response, subtype.as_deref())?);
                if page == pages || !steein::api::is_edge_shaped(response.decoded()) {
                    break;
                }
                let edge = response.graph_edge(subtype.as_deref())?;
                match client.next_page(&edge)? {
                    Some(next) => response = next,
                    None => break,
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Post {
            endpoint,
            params,
            subtype,
        } => {
            let client = build_client(&globals)?;
            let response = client.post(&endpoint, params)?;
            emit_json(graph_json(&response, subtype.as_deref())?);
            Ok(RunOutcome::ok())
        }
        Command::Delete { endpoint, params } => {
            let client = build_client(&globals)?;
            let response = client.delete(&endpoint, params)?;
            emit_json(graph_json(&response, None)?);
            Ok(RunOutcome::ok())
        }
        Command::Decode { subtype, status } => {
            let response = decode_offline(read_stdin()?, status).into_result()?;
            emit_json(graph_json(&response, subtype.as_deref())?);
            Ok(RunOutcome::ok())
        }
    }
}
