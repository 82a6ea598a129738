use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URL (e.g., http://localhost:8000)
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Mesa login code used to obtain a session key
    #[arg(short, long, default_value = "MESA-1-2025")]
    mesa_code: String,

    /// Number of verify requests to fire (ignored when --roster is set)
    #[arg(short = 'n', long, default_value_t = 200)]
    requests: usize,

    /// Number of concurrent requests
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Roster file of `dni,otp` lines; each entry is verified and then casts
    /// an empty ballot, which rotates the voter's PIN on the server
    #[arg(short, long)]
    roster: Option<PathBuf>,
}

#[derive(Serialize)]
struct MesaLoginRequest<'a> {
    mesa_code: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    dni: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct CastRequest<'a> {
    dni: &'a str,
    otp: &'a str,
}

/// Every API response carries `ok`; the other fields depend on the endpoint.
#[derive(Deserialize, Debug)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    mesa_key: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn login_mesa(client: &Client, base_url: &str, mesa_code: &str) -> Result<String> {
    let response: Envelope = client
        .post(format!("{base_url}/api/mesa/login"))
        .json(&MesaLoginRequest { mesa_code })
        .send()
        .await
        .context("Failed to send mesa login request")?
        .json()
        .await
        .context("Mesa login returned a non-JSON body")?;

    if !response.ok {
        bail!(
            "Mesa login rejected: {}",
            response.error.unwrap_or_default()
        );
    }
    response.mesa_key.context("Mesa login response had no key")
}

async fn run_voter_flow(
    client: &Client,
    base_url: &str,
    mesa_key: &str,
    dni: &str,
    otp: &str,
    cast: bool,
) -> Result<bool> {
    let verify: Envelope = client
        .post(format!("{base_url}/api/voter/verify"))
        .header("x-mesa-key", mesa_key)
        .json(&VerifyRequest { dni, otp })
        .send()
        .await
        .context("Failed to send verify request")?
        .json()
        .await
        .context("Verify returned a non-JSON body")?;

    if !verify.ok {
        return Ok(false);
    }

    if cast {
        // An empty cast still exercises the casting transaction: it rotates
        // the PIN and writes a ledger row without consuming any race.
        let response: Envelope = client
            .post(format!("{base_url}/api/vote/cast"))
            .header("x-mesa-key", mesa_key)
            .json(&CastRequest { dni, otp })
            .send()
            .await
            .context("Failed to send cast request")?
            .json()
            .await
            .context("Cast returned a non-JSON body")?;
        return Ok(response.ok);
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::new();

    let mesa_key = login_mesa(&client, &args.url, &args.mesa_code).await?;
    println!("Mesa authenticated at {}", args.url);

    // (dni, otp, run the cast step)
    let work: Vec<(String, String, bool)> = match &args.roster {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster {}", path.display()))?
            .lines()
            .filter_map(|line| {
                let (dni, otp) = line.split_once(',')?;
                Some((dni.trim().to_string(), otp.trim().to_string(), true))
            })
            .collect(),
        None => {
            // Synthetic dnis: the server answers "No encontrado", which is
            // still a full auth + lookup round trip.
            let mut rng = rand::thread_rng();
            (0..args.requests)
                .map(|i| {
                    (
                        format!("9{:07}", i),
                        rng.gen_range(100_000..1_000_000).to_string(),
                        false,
                    )
                })
                .collect()
        }
    };

    if work.is_empty() {
        bail!("Nothing to do: the roster file has no usable lines");
    }

    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let transport_errors = Arc::new(AtomicUsize::new(0));

    let bar = ProgressBar::new(work.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} ({per_sec})")
            .expect("valid progress template"),
    );

    let start = Instant::now();

    stream::iter(work)
        .for_each_concurrent(args.concurrency, |(dni, otp, cast)| {
            let client = &client;
            let base_url = &args.url;
            let mesa_key = &mesa_key;
            let accepted = accepted.clone();
            let rejected = rejected.clone();
            let transport_errors = transport_errors.clone();
            let bar = bar.clone();
            async move {
                match run_voter_flow(client, base_url, mesa_key, &dni, &otp, cast).await {
                    Ok(true) => accepted.fetch_add(1, Ordering::Relaxed),
                    Ok(false) => rejected.fetch_add(1, Ordering::Relaxed),
                    Err(_) => transport_errors.fetch_add(1, Ordering::Relaxed),
                };
                bar.inc(1);
            }
        })
        .await;

    bar.finish();

    let elapsed = start.elapsed();
    let total = accepted.load(Ordering::Relaxed)
        + rejected.load(Ordering::Relaxed)
        + transport_errors.load(Ordering::Relaxed);

    println!("Completed {} flows in {:.2?}", total, elapsed);
    println!(
        "  accepted: {}, rejected by the API: {}, transport errors: {}",
        accepted.load(Ordering::Relaxed),
        rejected.load(Ordering::Relaxed),
        transport_errors.load(Ordering::Relaxed),
    );
    println!(
        "  {:.1} requests/second",
        total as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}
