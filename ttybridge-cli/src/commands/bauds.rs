//! Baud table command implementation.

use {
    crate::{Cli, baud_policy, config::Config},
    anyhow::Result,
    console::style,
    ttybridge::{BaudRate, FALLBACK_BAUD, LineSettings, resolve_baud},
};

/// Print the supported speeds, the fallback and the fixed line settings.
pub(crate) fn cmd_bauds(cli: &Cli, config: &Config, resolve: Option<u32>, json: bool) -> Result<()> {
    let policy = baud_policy(cli, config);
    // Resolve first so a strict-mode refusal leaves stdout empty.
    let resolved = resolve
        .map(|baud| resolve_baud(baud, policy).map(|applied| (baud, applied)))
        .transpose()?;

    if json {
        let mut data = serde_json::json!({
            "bauds": BaudRate::ALL.map(BaudRate::nominal),
            "fallback": FALLBACK_BAUD.nominal(),
            "line": LineSettings::RAW_8N1.to_string(),
        });
        if let Some((requested, applied)) = resolved {
            data["resolve"] = serde_json::json!({
                "requested": requested,
                "applied": applied.nominal(),
            });
        }
        let output = serde_json::json!({ "ok": true, "data": data });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for rate in BaudRate::ALL {
        let marker = if rate == FALLBACK_BAUD {
            style(" (fallback)")
                .dim()
                .to_string()
        } else {
            String::new()
        };
        println!("{rate}{marker}");
    }
    eprintln!("{} {}", style("Line:").bold(), LineSettings::RAW_8N1);

    if let Some((requested, applied)) = resolved {
        eprintln!("{} {requested} -> {applied}", style("Resolve:").bold());
    }
    Ok(())
}
