//! Writes demonstration input files for the `xdose` CLI:
//!
//! - `bsf_grid_synthetic.json`: a smooth SYNTHETIC backscatter grid for water.
//!   Its values only have the right order of magnitude and are not reference data.
//! - `spectra/<kVp>kVp.csv`: unfiltered Kramers-law spectra at 100 cm per mAs.
//!
//! Usage: `generate_sample [output_dir]` (default `samples`).

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

const SSD_CM: [f64; 6] = [50.0, 75.0, 100.0, 150.0, 200.0, 300.0];
const DIAMETER_CM: [f64; 9] = [1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0];
const TUBE_POTENTIALS_KVP: [u32; 4] = [60, 80, 100, 120];

/// Peaks near 60 keV, rises with field size, falls slightly at short SSD.
fn synthetic_bsf(ssd: f64, energy: f64, diameter: f64) -> f64 {
    let x = energy / 60.0;
    let energy_term = 0.48 * x * (1.0 - x).exp();
    let field_term = 1.0 - (-diameter / 8.0).exp();
    let distance_term = 1.0 - 0.04 * (100.0 / ssd);
    1.0 + energy_term * field_term * distance_term
}

/// Unfiltered thick-target spectrum, Φ ∝ (kVp - E) / E, 0.5 keV bins from 10 keV.
fn kramers(kvp: f64) -> Vec<(f64, f64)> {
    let scale = 4.0e5;
    (0..)
        .map(|i| 10.0 + 0.5 * i as f64)
        .take_while(|&e| e < kvp)
        .map(|e| (e, scale * (kvp - e) / e))
        .collect()
}

fn write_grid(dir: &Path) -> Result<()> {
    let energies: Vec<f64> = (1..=40).map(|i| 5.0 * i as f64).collect();

    let bsf: Vec<Vec<Vec<f64>>> = SSD_CM
        .iter()
        .map(|&s| {
            energies
                .iter()
                .map(|&e| DIAMETER_CM.iter().map(|&d| synthetic_bsf(s, e, d)).collect())
                .collect()
        })
        .collect();

    let doc = json!({
        "description": "SYNTHETIC backscatter factors for demonstration only; not reference data",
        "phantom": "water",
        "ssd": SSD_CM,
        "energy": energies,
        "diameter": DIAMETER_CM,
        "bsf": bsf,
    });

    let path = dir.join("bsf_grid_synthetic.json");
    fs::write(&path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_spectrum(dir: &Path, kvp: u32) -> Result<()> {
    let path = dir.join(format!("{}kVp.csv", kvp));
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(["energy_kev", "fluence"])?;
    for (e, phi) in kramers(kvp as f64) {
        writer.write_record([format!("{:.1}", e), format!("{:.6e}", phi)])?;
    }
    writer.flush()?;

    println!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let out = std::env::args().nth(1).unwrap_or_else(|| "samples".to_string());
    let out = Path::new(&out);
    let spectra = out.join("spectra");
    fs::create_dir_all(&spectra).with_context(|| format!("creating {}", spectra.display()))?;

    write_grid(out)?;
    for kvp in TUBE_POTENTIALS_KVP {
        write_spectrum(&spectra, kvp)?;
    }

    println!(
        "Try: xdose calc -s {}/120kVp.csv --kvp 120 --ma 100 --time 0.1 --filter Al:2.5 \
         --diameter 10 --bsf-grid {}/bsf_grid_synthetic.json",
        spectra.display(),
        out.display()
    );
    Ok(())
}
