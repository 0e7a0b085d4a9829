use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ctk_transport::messages::SearchDatasetsRequest;
use ctk_transport::{Client, EndpointMap, EndpointSources, TrafficRegistry, WireTrace};

/// Probe a GA4GH server: load the endpoint table, call searchDatasets once,
/// and print what went over the wire.
#[derive(Debug, Parser)]
#[command(name = "ctk-probe")]
struct Cli {
    /// Endpoint resource to load (embedded, then from the filesystem).
    #[arg(long, default_value = "")]
    resource: String,

    /// Runtime property override, e.g. `-D ctk.tgt.urlRoot=http://host:8000/`.
    #[arg(short = 'D', value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Server root, applied after every other layer.
    #[arg(long)]
    url_root: Option<String>,

    #[arg(long, default_value_t = 1)]
    page_size: i32,

    /// Print the merged endpoint table and exit.
    #[arg(long)]
    dump_endpoints: bool,
}

fn parse_property(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {text:?}")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ctk-probe: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, ctk_transport::TransportError> {
    let mut sources = EndpointSources::from_process();
    for (key, value) in &cli.properties {
        sources = sources.with_property(key, value);
    }
    let mut endpoints = EndpointMap::load(&cli.resource, &sources)?;
    if let Some(root) = &cli.url_root {
        endpoints.set_url_root(root);
        endpoints.url_root()?;
    }

    if cli.dump_endpoints {
        for (key, value) in endpoints.iter() {
            println!("{key}={value}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let traffic = TrafficRegistry::shared();
    let client = Client::over_http(Arc::new(endpoints), Arc::clone(&traffic));
    let mut trace = WireTrace::new();
    let request = SearchDatasetsRequest {
        page_size: Some(cli.page_size),
        page_token: None,
    };
    let outcome = client.metadata().traced(&mut trace).search_datasets(&request);

    println!("url:      {}", trace.url().unwrap_or("-"));
    println!("sent:     {}", trace.body_sent().unwrap_or("-"));
    println!("received: {}", trace.body_received().unwrap_or("-"));
    match trace.response_status() {
        Some(status) => println!("status:   {status}"),
        None => println!("status:   no response"),
    }
    for row in traffic.snapshot() {
        println!("traffic:  {} -> {} [{}]", row.request, row.response, row.status);
    }

    let code = match outcome {
        Ok(Some(response)) => {
            println!("datasets: {}", response.datasets.len());
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("ctk-probe: server did not answer");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ctk-probe: {e}");
            ExitCode::FAILURE
        }
    };
    Ok(code)
}
