//! attribution-runner: headless front end for the attribution engine.
//!
//! Usage:
//!   attribution-runner --input deal.json
//!   attribution-runner --db attribution.db --demo 12345
//!   attribution-runner --db attribution.db --ipc-mode

use anyhow::Result;
use attribution_core::{
    demo::DemoDataset,
    store::{AttributionStore, DateRange, NewDeal, NewPartner, NewTouchpoint, TouchpointFilter},
    AttributionConfig, AttributionEngine, AttributionModel, AttributionService, DealContext,
    Touchpoint,
};
use chrono::Utc;
use std::env;
use std::io::{self, BufRead, Write};

const DEMO_PARTNERS: usize = 12;
const DEMO_DEALS: usize = 40;
const DEFAULT_PAGE_LIMIT: u32 = 100;

/// `limit`/`offset` for list commands.
#[derive(serde::Deserialize, serde::Serialize, Clone, Copy)]
struct Page {
    #[serde(default = "default_page_limit")]
    limit:  u32,
    #[serde(default)]
    offset: u32,
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    AddPartner {
        #[serde(flatten)]
        partner: NewPartner,
    },
    RecordDeal {
        #[serde(flatten)]
        deal: NewDeal,
    },
    TrackTouchpoint {
        #[serde(flatten)]
        touchpoint: NewTouchpoint,
    },
    GetAttribution {
        deal_id: String,
        #[serde(default)]
        recalculate: bool,
    },
    Recalculate {
        deal_id: String,
    },
    Preview {
        deal_id: String,
        model: String,
    },
    Analytics {
        #[serde(flatten)]
        range: DateRange,
    },
    PartnerAnalytics {
        partner_id: String,
    },
    ListPartners {
        #[serde(flatten)]
        page: Page,
    },
    ListDeals {
        #[serde(flatten)]
        page: Page,
    },
    ListTouchpoints {
        #[serde(flatten)]
        filter: TouchpointFilter,
        #[serde(flatten)]
        page: Page,
    },
    Quit,
}

/// `--input` document: one deal and its touchpoints, computed without a store.
#[derive(serde::Deserialize)]
struct InputDocument {
    deal: InputDeal,
    #[serde(default)]
    touchpoints: Vec<Touchpoint>,
}

#[derive(serde::Deserialize)]
struct InputDeal {
    deal_id: String,
    amount: f64,
    model: String,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = find_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = find_arg(&args, "--data-dir").unwrap_or("./data");
    let demo_seed: Option<u64> = find_arg(&args, "--demo").and_then(|s| s.parse().ok());

    let config = load_config(data_dir);

    if let Some(path) = find_arg(&args, "--input") {
        return run_input(path, config);
    }

    let store = AttributionStore::open(db)?;
    store.migrate()?;

    if let Some(seed) = demo_seed {
        DemoDataset::generate(seed, DEMO_PARTNERS, DEMO_DEALS, Utc::now()).load_into(&store)?;
    }

    let service = AttributionService::new(store, config);

    if ipc_mode {
        run_ipc_loop(&service)?;
    } else {
        print_summary(&service)?;
    }
    Ok(())
}

/// Fall back to built-in weights when no config file is present.
fn load_config(data_dir: &str) -> AttributionConfig {
    match AttributionConfig::load(data_dir) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default attribution config: {e}");
            AttributionConfig::default()
        }
    }
}

fn run_input(path: &str, config: AttributionConfig) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let doc: InputDocument = serde_json::from_str(&content)?;
    let deal = DealContext {
        deal_id: doc.deal.deal_id,
        amount: doc.deal.amount,
        model: doc.deal.model.parse()?,
    };
    let engine = AttributionEngine::new(config);
    let breakdown = engine.compute_attribution(&deal, &doc.touchpoints, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(())
}

fn run_ipc_loop(service: &AttributionService) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let response = match handle_command(service, cmd) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("command failed: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(service: &AttributionService, cmd: IpcCommand) -> Result<serde_json::Value> {
    let store = service.store();
    let value = match cmd {
        IpcCommand::AddPartner { partner } => {
            serde_json::json!({ "partner": store.insert_partner(&partner)? })
        }
        IpcCommand::RecordDeal { deal } => {
            serde_json::json!({ "deal": store.insert_deal(&deal)? })
        }
        IpcCommand::TrackTouchpoint { touchpoint } => {
            serde_json::json!({ "touchpoint": store.insert_touchpoint(&touchpoint)? })
        }
        IpcCommand::GetAttribution { deal_id, recalculate } => {
            serde_json::to_value(service.attribution_for_deal(&deal_id, recalculate)?)?
        }
        IpcCommand::Recalculate { deal_id } => {
            serde_json::to_value(service.recalculate(&deal_id)?)?
        }
        IpcCommand::Preview { deal_id, model } => {
            let model: AttributionModel = model.parse()?;
            serde_json::to_value(service.preview(&deal_id, model)?)?
        }
        IpcCommand::Analytics { range } => serde_json::to_value(store.analytics_overview(&range)?)?,
        IpcCommand::PartnerAnalytics { partner_id } => {
            serde_json::to_value(store.partner_analytics(&partner_id)?)?
        }
        IpcCommand::ListPartners { page } => serde_json::json!({
            "partners": store.list_partners(page.limit, page.offset)?,
            "limit": page.limit,
            "offset": page.offset,
        }),
        IpcCommand::ListDeals { page } => serde_json::json!({
            "deals": store.list_deals(page.limit, page.offset)?,
            "limit": page.limit,
            "offset": page.offset,
        }),
        IpcCommand::ListTouchpoints { filter, page } => serde_json::json!({
            "touchpoints": store.list_touchpoints(&filter, page.limit, page.offset)?,
            "limit": page.limit,
            "offset": page.offset,
        }),
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn print_summary(service: &AttributionService) -> Result<()> {
    let store = service.store();
    let deals = store.list_deals(u32::MAX, 0)?;

    println!("=== ATTRIBUTION SUMMARY ===");
    println!("  deals:          {}", deals.len());
    for deal in deals.iter().rev() {
        let view = service.attribution_for_deal(&deal.deal_id, false)?;
        let top = view
            .breakdown
            .attributions
            .first()
            .map(|a| format!("{} {:.2}%", a.partner_name, a.percentage))
            .unwrap_or_else(|| "(no touchpoints)".to_string());
        println!(
            "  {} | ${:>11.2} | {:<11} | partners: {} | top: {}",
            deal.deal_id,
            deal.amount,
            deal.attribution_model.as_str(),
            view.breakdown.attributions.len(),
            top
        );
    }

    let analytics = store.analytics_overview(&DateRange::default())?;
    println!();
    println!("=== TOP PARTNERS ===");
    if analytics.partners.is_empty() {
        println!("  (No partners recorded yet)");
    }
    for p in analytics.partners.iter().take(5) {
        println!(
            "  {:<32} | deals: {:>3} | payout: ${:.2}",
            p.name, p.deals_count, p.total_payout
        );
    }
    Ok(())
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
