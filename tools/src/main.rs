//! projection-runner: headless GTM plan runner.
//!
//! Usage:
//!   projection-runner --plan data/plans/intent_full_stack.json
//!   projection-runner --plan plan.json --data-dir ./data --periods 36 --json
//!   projection-runner --ipc-mode --data-dir ./data

mod format;

use anyhow::{anyhow, Result};
use gtm_core::{
    channel::{Channel, ChannelConfig},
    funnel::{ConversionRates, EconomicsInput},
    infrastructure::VolumeTargets,
    knowledge_base::IcpSelectors,
    EngineResult, GtmEngine, GtmPlan, PlanRequest,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Plan {
        request: PlanRequest,
    },
    Funnel {
        channels:    ChannelConfig,
        signal_tier: String,
        #[serde(default)]
        icp:         IcpSelectors,
        economics:   EconomicsInput,
        rates:       ConversionRates,
    },
    Infrastructure {
        channels: ChannelConfig,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json = args.iter().any(|a| a == "--json");
    let plan_path = flag_value(&args, "--plan");
    let data_dir = flag_value(&args, "--data-dir");

    let engine = match data_dir {
        Some(dir) => GtmEngine::from_data_dir(dir)?,
        None => GtmEngine::builtin(),
    };

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    let Some(path) = plan_path else {
        anyhow::bail!("--plan <file> is required unless --ipc-mode is set");
    };
    let mut request = load_request(path)?;
    request.period_count = parse_arg(&args, "--periods", request.period_count);

    if !json {
        println!("GTM projection-runner");
        println!("  plan:      {path}");
        println!("  data_dir:  {}", data_dir.unwrap_or("(built-in)"));
        println!("  periods:   {}", request.period_count);
        println!();
    }

    let plan = engine.plan(&request)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_summary(&engine, &request, &plan);
    }

    Ok(())
}

fn load_request(path: &str) -> Result<PlanRequest> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow!("Cannot parse {path}: {e}"))
}

fn run_ipc_loop(engine: &GtmEngine) -> Result<()> {
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
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = handle_command(engine, cmd).unwrap_or_else(|e| {
            log::warn!("ipc: command failed: {e}");
            serde_json::json!({ "error": e.to_string() })
        });
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &GtmEngine, cmd: IpcCommand) -> EngineResult<serde_json::Value> {
    let reply = match cmd {
        IpcCommand::Plan { request } => serde_json::to_value(engine.plan(&request)?)?,
        IpcCommand::Funnel { channels, signal_tier, icp, economics, rates } => {
            let projection = engine.project_funnel(&channels, &signal_tier, &icp, &economics, &rates);
            serde_json::to_value(projection)?
        }
        IpcCommand::Infrastructure { channels } => {
            let targets = VolumeTargets::from_channels(&channels, &engine.knowledge_base().volume_rules);
            serde_json::to_value(engine.estimate_infrastructure_costs(&channels, &targets))?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(reply)
}

fn print_summary(engine: &GtmEngine, request: &PlanRequest, plan: &GtmPlan) {
    let kb = engine.knowledge_base();
    let rate = plan
        .currency
        .as_ref()
        .or_else(|| kb.currencies.get(kb.currencies.base));
    let money = |amount: f64| format::display_money(amount, rate);

    let channels: Vec<&str> = Channel::ALL
        .iter()
        .filter(|c| request.channels.is_enabled(**c))
        .map(|c| c.name())
        .collect();

    println!("=== PLAN ===");
    println!("  signal tier:    {}", request.signal_tier);
    println!("  channels:       {}", if channels.is_empty() { "(none)".into() } else { channels.join(", ") });
    if let Some(r) = rate {
        println!("  currency:       {:?} ({} per base unit, as of {})", r.code, r.rate, r.rate_date);
    }

    let base = &plan.base;
    println!();
    println!("=== MONTHLY FUNNEL (base) ===");
    println!("  touches:        {}", base.touches);
    println!("  responses:      {}", base.responses);
    println!("  meetings:       {}", base.meetings);
    println!("  opportunities:  {}", base.opportunities);
    println!("  clients:        {}", base.clients);
    println!("  revenue:        {}", money(base.revenue));
    println!(
        "  reply rate:     {:.2}% (base {:.2}% | icp x{:.2} | synergy x{:.2} {})",
        base.effective_reply_rate * 100.0,
        base.base_reply_rate * 100.0,
        base.icp.combined,
        base.synergy.multiplier,
        base.synergy.name.as_deref().unwrap_or("composed"),
    );

    let inv = &plan.investment;
    println!();
    println!("=== MONTHLY INVESTMENT ===");
    println!(
        "  infrastructure: {} ({} mailboxes, {} identities)",
        money(inv.infrastructure),
        plan.infrastructure.mailboxes,
        plan.infrastructure.identities
    );
    println!("  ad spend:       {}", money(inv.ad_spend));
    match &plan.budget_tier {
        Some(tier) => println!("  retainer:       {} ({})", money(inv.retainer), tier.label),
        None => println!("  retainer:       {}", money(inv.retainer)),
    }
    println!("  total:          {}", money(inv.total));

    println!();
    println!("=== SCENARIOS ({} periods) ===", request.period_count);
    for entry in &plan.timelines {
        let clients = plan.series(entry.scenario).map_or(0, |s| s.projection.clients);
        let t = &entry.timeline;
        let break_even = t
            .break_even_point()
            .map_or_else(|| "not within horizon".to_string(), |p| p.label.clone());
        println!(
            "  {:<12} | clients/mo: {:>4} | revenue: {:>8} | net: {:>8} | ROI: {:>8} | break-even: {}",
            entry.scenario.name(),
            clients,
            money(t.total_revenue),
            money(t.net_return),
            format::format_percent(t.roi_percent),
            break_even,
        );
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
