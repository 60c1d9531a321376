//! Steer a beam and push it through a simulated AWMF-0108.
//!
//! Usage: cargo run --example steer_beam -- [theta_deg] [phi_deg] [freq_ghz]
//!
//! Set `RUST_LOG=awmf_beam=debug` to see solver and calibration detail.

use std::process;

use awmf_beam::angle::wavelength_from_frequency;
use awmf_beam::pattern::peak;
use awmf_beam::{BeamDefinition, CommandFormat, Commander, Mode, PatternOptions, SimulatedDevice};
use tracing_subscriber::EnvFilter;

fn arg(n: usize, default: f64) -> f64 {
    match std::env::args().nth(n) {
        Some(s) => s.parse().unwrap_or_else(|e| {
            eprintln!("argument {n} ({s:?}): {e}");
            process::exit(2);
        }),
        None => default,
    }
}

fn hex(words: &[u8]) -> String {
    words.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let theta = arg(1, 15.0);
    let phi = arg(2, 20.0);
    let freq_ghz = arg(3, 28.0);

    if let Err(e) = run(theta, phi, freq_ghz) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(theta: f64, phi: f64, freq_ghz: f64) -> Result<(), Box<dyn std::error::Error>> {
    let wavelength = wavelength_from_frequency(freq_ghz * 1e9)?;
    let mut beam = BeamDefinition::new(theta, phi, wavelength)?;

    println!("theta {theta}°  phi {phi}°  {freq_ghz} GHz (λ = {:.3} mm)", wavelength * 1e3);
    for (el, setting) in beam.phase_settings()? {
        println!("  {el}: phase step {setting:>2}");
    }

    let samples = beam.sample_pattern(90, 72, PatternOptions::default())?;
    if let Some(top) = peak(&samples) {
        println!("pattern peak at theta {:.0}°, phi {:.0}°", top.theta_deg, top.phi_deg);
    }

    let mut cmd = Commander::new(SimulatedDevice::new(), CommandFormat::AWMF_0108);
    cmd.set_on_send(|mode, words| println!("{mode:?} -> [{}]", hex(words)));
    cmd.steer(Mode::Transmit, &mut beam)?;
    cmd.steer(Mode::Receive, &mut beam)?;
    cmd.steer(Mode::Standby, &mut beam)?;

    let dev = cmd.into_inner();
    println!("enable line history: {:?}", dev.line_history());
    Ok(())
}
