use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use strykanalys::fetch::{DEFAULT_ATTEMPTS, FetchOptions};
use strykanalys::ops::{self, OpPayload};
use strykanalys::sheet_layout::LayoutPolicy;
use strykanalys::state::MatchStore;

const USAGE: &str = "\
strykanalys - hämtar stryktipsdata och fyller analysmallen

USAGE:
    strykanalys [OPTIONS]

OPTIONS:
    --coupon <URL>       replace the coupon from the betting-coupon site
    --stryket <URL>      replace the coupon from the odds-commentary site
                         (runs after --coupon when both are given)
    --footy <N=URL>      fetch statistics for match N (1..13), repeatable
    --export             write the filled workbook
    --template <PATH>    template workbook (env TEMPLATE_PATH)
    --out <PATH>         output workbook (env OUTPUT_PATH)
    --state              print the store contents as JSON
    --debug              include raw-document sizes in payloads
    --help               show this text

ENV:
    TEMPLATE_PATH        default Stryktipsanalys_MASTER.xlsx
    OUTPUT_PATH          default Stryktipsanalys_fylld.xlsx
    FETCH_ATTEMPTS       attempt budget per fetch, default 3
    LAYOUT_SELF_HEAL     0 disables structural column repair, default 1
";

struct Args {
    coupon_url: Option<String>,
    stryket_url: Option<String>,
    footy: Vec<(u8, String)>,
    template: PathBuf,
    out: PathBuf,
    export: bool,
    show_state: bool,
    debug: bool,
    attempts: u32,
    policy: LayoutPolicy,
}

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;
    let store = MatchStore::new();
    let opts = FetchOptions {
        attempts: args.attempts,
        debug: args.debug,
    };

    if let Some(url) = &args.coupon_url {
        print_payload("svenskaspel", &ops::refresh_coupon(&store, url, &opts))?;
    }
    if let Some(url) = &args.stryket_url {
        print_payload("stryket", &ops::refresh_stryket(&store, url, &opts))?;
    }
    for (match_nr, url) in &args.footy {
        print_payload("footy", &ops::refresh_footy(&store, *match_nr, url, &opts))?;
    }

    if args.export {
        let (bytes, report) = ops::export(&store, &args.template, args.policy)?;
        fs::write(&args.out, &bytes)
            .with_context(|| format!("cannot write {}", args.out.display()))?;
        let summary = serde_json::json!({
            "ok": true,
            "file": args.out.display().to_string(),
            "bytes": bytes.len(),
            "coupon_rows": report.coupon_rows,
            "stats_rows": report.stats_rows,
            "inserted_columns": report.inserted_columns,
            "skipped_fields": report.skipped_fields,
        });
        println!("export: {summary}");
    }

    if args.show_state {
        let snapshot = ops::debug_state(&store);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

fn print_payload(op: &str, payload: &OpPayload) -> Result<()> {
    println!("{op}: {}", serde_json::to_string(payload)?);
    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        coupon_url: None,
        stryket_url: None,
        footy: Vec::new(),
        template: PathBuf::from(
            env::var("TEMPLATE_PATH").unwrap_or_else(|_| "Stryktipsanalys_MASTER.xlsx".to_string()),
        ),
        out: PathBuf::from(
            env::var("OUTPUT_PATH").unwrap_or_else(|_| "Stryktipsanalys_fylld.xlsx".to_string()),
        ),
        export: false,
        show_state: false,
        debug: false,
        attempts: env::var("FETCH_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_ATTEMPTS)
            .clamp(1, 10),
        policy: if env_bool("LAYOUT_SELF_HEAL", true) {
            LayoutPolicy::InsertMissing
        } else {
            LayoutPolicy::SkipMissing
        },
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--coupon" => args.coupon_url = Some(next_value(&mut iter, "--coupon")?),
            "--stryket" => args.stryket_url = Some(next_value(&mut iter, "--stryket")?),
            "--footy" => {
                let value = next_value(&mut iter, "--footy")?;
                let Some((nr, url)) = value.split_once('=') else {
                    bail!("--footy expects N=URL, got {value}");
                };
                let nr: u8 = nr
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid match number in --footy {value}"))?;
                args.footy.push((nr, url.trim().to_string()));
            }
            "--template" => args.template = PathBuf::from(next_value(&mut iter, "--template")?),
            "--out" => args.out = PathBuf::from(next_value(&mut iter, "--out")?),
            "--export" => args.export = true,
            "--state" => args.show_state = true,
            "--debug" => args.debug = true,
            "--help" | "-h" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument {other}\n\n{USAGE}"),
        }
    }

    Ok(args)
}

fn next_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    match iter.next() {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => bail!("{flag} expects a value\n\n{USAGE}"),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
