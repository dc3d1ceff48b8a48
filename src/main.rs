use clap::Parser; // for cli
use serde_json::Value;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use supabase_kit::config::{Args, Command};
use supabase_kit::{Error, Filter, Result, SupabaseClient, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    // parse cli arguments
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let result = run(&args).await;

    if args.print_metrics {
        eprintln!("{}", metrics::render());
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let client = SupabaseClient::new(args.client_config())?;
    client.loading().set_observer(|is_loading: bool, message: Option<&str>| {
        if is_loading {
            info!("{}...", message.unwrap_or("working"));
        }
    });

    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        client.sign_in_with_password(email, password).await?;
    }

    // the session is revoked whether or not the command succeeded
    let outcome = execute(&client, &args.command).await;
    settle(outcome, client.sign_out().await)
}

async fn execute(client: &SupabaseClient, command: &Command) -> Result<()> {
    match command {
        Command::Invoke { name, body, window_ms } => {
            let body: Value = serde_json::from_str(body)?;
            let response: Value = match window_ms {
                Some(ms) => {
                    let window = Duration::from_millis(*ms);
                    client.invoke_with_window(name, &body, window).await?
                }
                None => client.invoke(name, &body).await?,
            };
            print_json(&response)?;
        }
        Command::Select { table, columns, eq, in_list, order, limit } => {
            let filter = build_filter(eq, in_list, order, *limit)?;
            let rows: Vec<Value> = client.select(table, columns, &filter).await?;
            print_json(&rows)?;
        }
        Command::Rpc { function, params } => {
            let params: Value = serde_json::from_str(params)?;
            let response: Value = client.rpc(function, &params).await?;
            print_json(&response)?;
        }
        Command::Upload { bucket, path, file, content_type, upsert } => {
            let bytes = tokio::fs::read(file).await?;
            let uploaded = client.upload(bucket, path, bytes, content_type, *upsert).await?;
            print_json(&uploaded)?;
        }
        Command::Download { bucket, path, out } => {
            let bytes = client.download(bucket, path).await?;
            tokio::fs::write(out, &bytes).await?;
            info!("wrote {} bytes to {}", bytes.len(), out.display());
        }
        Command::PublicUrl { bucket, path } => {
            println!("{}", client.public_url(bucket, path)?);
        }
    }
    Ok(())
}

// A failed command is reported over a failed sign-out
fn settle(outcome: Result<()>, signed_out: Result<()>) -> Result<()> {
    match (outcome, signed_out) {
        (Err(e), Err(sign_out)) => {
            warn!("sign out failed: {}", sign_out);
            Err(e)
        }
        (outcome, signed_out) => outcome.and(signed_out),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// CLI values are read as JSON when possible (numbers, booleans, null), text otherwise
fn cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(column, _)| !column.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("expected column=value, got {:?}", raw)))
}

fn build_filter(
    eq: &[String],
    in_list: &[String],
    order: &[String],
    limit: Option<usize>,
) -> Result<Filter> {
    let mut filter = Filter::new();
    for raw in eq {
        let (column, value) = split_pair(raw)?;
        filter = filter.eq(column, cli_value(value));
    }
    for raw in in_list {
        let (column, values) = split_pair(raw)?;
        filter = filter.in_list(column, values.split(',').map(|v| cli_value(v.trim())));
    }
    for raw in order {
        filter = filter.order_by(raw);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    Ok(filter)
}
