#[cfg(not(feature = "audio-cpal"))]
fn main() {
    eprintln!("tamu probe requires the 'audio-cpal' feature");
    std::process::exit(1);
}

#[cfg(feature = "audio-cpal")]
fn main() {
    if let Err(e) = run() {
        eprintln!("probe failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "audio-cpal")]
fn run() -> Result<(), String> {
    use tamu_core::audio::device::list_input_devices;

    struct Args {
        json: bool,
    }

    fn parse_args() -> Result<Args, String> {
        let mut json = false;
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--json" => json = true,
                "--help" | "-h" => {
                    println!("Usage: cargo run -p tamu-core --bin probe -- [--json]");
                    std::process::exit(0);
                }
                other => return Err(format!("unknown argument: {other}")),
            }
        }
        Ok(Args { json })
    }

    let args = parse_args()?;
    let devices = list_input_devices();

    if args.json {
        let json = serde_json::to_string_pretty(&devices).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    if devices.is_empty() {
        println!("No input devices found.");
        return Ok(());
    }

    println!("Input devices ({}):", devices.len());
    for device in &devices {
        let mut tags = Vec::new();
        if device.is_recommended {
            tags.push("recommended");
        }
        if device.is_default {
            tags.push("default");
        }
        if device.is_loopback_like {
            tags.push("loopback?");
        }
        if tags.is_empty() {
            println!("  {}", device.name);
        } else {
            println!("  {}  [{}]", device.name, tags.join(", "));
        }
    }

    Ok(())
}
