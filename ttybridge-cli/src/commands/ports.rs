//! Port listing command implementation.

use {
    anyhow::Result,
    console::style,
    ttybridge::{DetectedPort, discover_ports, format_port_list},
};

fn port_json(p: &DetectedPort) -> serde_json::Value {
    serde_json::json!({
        "name": p.name,
        "device": p.device.name(),
        "known": p.device.is_known(),
        "vid": p.vid,
        "pid": p.pid,
        "manufacturer": p.manufacturer,
        "product": p.product,
        "serial": p.serial,
    })
}

/// List ports command implementation.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let detected = discover_ports()?;

    if json {
        let ports: Vec<serde_json::Value> = detected
            .iter()
            .map(port_json)
            .collect();
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "ports": ports,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    eprintln!(
        "{}",
        style("Available serial ports:")
            .bold()
            .underlined()
    );

    if detected.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
        return Ok(());
    }

    for line in format_port_list(&detected) {
        eprintln!("  {} {}", style("•").green(), style(line).cyan());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttybridge::DeviceKind;

    #[test]
    fn test_port_json_fields() {
        let port = DetectedPort {
            name: "/dev/ttyUSB0".to_string(),
            device: DeviceKind::Prolific,
            vid: Some(0x067B),
            pid: Some(0x2303),
            manufacturer: None,
            product: Some("USB-Serial Controller".to_string()),
            serial: None,
        };
        let value = port_json(&port);
        assert_eq!(value["name"], "/dev/ttyUSB0");
        assert_eq!(value["device"], "PL2303");
        assert_eq!(value["known"], true);
        assert_eq!(value["vid"], 0x067B);
        assert!(value["serial"].is_null());
    }
}
