//! Property-based tests (proptest) for the dose engine and the BSF grid.

use proptest::prelude::*;
use xdose::models::{ExposureParameters, Material, Spectrum};
use xdose::physics::{
    air_kerma, transmission, AttenuationDataStore, BackscatterGrid, BackscatterInterpolator,
    DosimetryEngine, EngineConfig, FiltrationMode, KermaSource,
};

/// Strictly increasing axis built from positive steps.
fn axis(start: f64, steps: Vec<f64>) -> Vec<f64> {
    let mut out = vec![start];
    for step in steps {
        let last = out[out.len() - 1];
        out.push(last + step);
    }
    out
}

fn spectrum_strategy() -> impl Strategy<Value = Spectrum> {
    prop::collection::btree_set(15u32..140, 2..20).prop_flat_map(|energies| {
        let n = energies.len();
        prop::collection::vec(1.0f64..1.0e6, n).prop_map(move |fluence| {
            let pairs: Vec<(f64, f64)> = energies
                .iter()
                .map(|&e| e as f64)
                .zip(fluence)
                .collect();
            Spectrum::from_pairs(&pairs).unwrap()
        })
    })
}

// ── Beam quality ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Beam hardening: the second HVL is never thinner than the first.
    #[test]
    fn hvl2_not_below_hvl1(spectrum in spectrum_strategy()) {
        let config = EngineConfig {
            filtration: FiltrationMode::AlreadyApplied,
            ..Default::default()
        };
        let engine = DosimetryEngine::new(AttenuationDataStore::standard(), config);
        let params = ExposureParameters { kvp: 150.0, ..Default::default() };

        let result = engine.calculate(&params, &spectrum, KermaSource::FromSpectrum).unwrap();
        let h1 = result.hvl1_mm.unwrap();
        let h2 = result.hvl2_mm.unwrap();
        prop_assert!(h2 >= h1 * (1.0 - 1e-8), "HVL1 = {}, HVL2 = {}", h1, h2);

        let hc = result.homogeneity_coefficient.unwrap();
        prop_assert!(hc > 0.0 && hc <= 1.0);
    }

    /// Transmission through a thicker layer is never larger.
    #[test]
    fn transmission_decreases(spectrum in spectrum_strategy(), t in 0.0f64..20.0, dt in 0.01f64..5.0) {
        let store = AttenuationDataStore::standard();
        let mu = store.attenuation_curve(Material::Aluminium, spectrum.energies()).unwrap();
        let thin = transmission(&spectrum, &mu, t);
        let thick = transmission(&spectrum, &mu, t + dt);
        prop_assert!(thick < thin);
        prop_assert!(thin <= 1.0 + 1e-12);
    }
}

// ── Air kerma ────────────────────────────────────────────────────────

proptest! {
    /// IAK is linear in the tube charge.
    #[test]
    fn iak_linear_in_mas(
        rate in 1.0f64..500.0,
        ma in 1.0f64..500.0,
        time in 0.001f64..5.0,
        ssd in 50.0f64..300.0,
        factor in 0.1f64..2.0,
    ) {
        let base = air_kerma(rate, ma, time, ssd);
        let scaled = air_kerma(rate, ma * factor, time, ssd);
        prop_assert!((scaled - base * factor).abs() <= 1e-12 * base * factor);
    }
}

// ── Backscatter grid ─────────────────────────────────────────────────

proptest! {
    /// Interpolating exactly at a node returns the stored value.
    #[test]
    fn grid_nodes_round_trip(
        ssd_steps in prop::collection::vec(5.0f64..50.0, 0..4),
        energy_steps in prop::collection::vec(1.0f64..30.0, 0..6),
        diameter_steps in prop::collection::vec(0.5f64..10.0, 0..4),
        seed in 0u64..1000,
    ) {
        let ssd = axis(50.0, ssd_steps);
        let energy = axis(10.0, energy_steps);
        let diameter = axis(1.0, diameter_steps);
        let n = ssd.len() * energy.len() * diameter.len();
        let values: Vec<f64> = (0..n)
            .map(|i| 1.0 + ((i as u64 * 7919 + seed) % 997) as f64 / 997.0)
            .collect();

        let grid = BackscatterGrid::new(ssd, energy, diameter, values, Material::Water).unwrap();
        let interp = BackscatterInterpolator::new(grid.clone());
        let (ns, ne, nd) = grid.shape();

        for i in 0..ns {
            for j in 0..ne {
                for k in 0..nd {
                    let v = interp.evaluate(grid.ssd_axis()[i], grid.energy_axis()[j], grid.diameter_axis()[k]);
                    prop_assert!(!v.is_fallback());
                    prop_assert_eq!(v.value(), grid.value(i, j, k));
                }
            }
        }
    }

    /// Energies above the grid never extrapolate.
    #[test]
    fn above_grid_energy_falls_back(excess in 0.001f64..100.0) {
        let grid = BackscatterGrid::new(
            vec![100.0],
            vec![10.0, 100.0],
            vec![10.0],
            vec![1.2, 1.4],
            Material::Water,
        ).unwrap();
        let interp = BackscatterInterpolator::new(grid);
        let v = interp.evaluate(100.0, 100.0 + excess, 10.0);
        prop_assert!(v.is_fallback());
        prop_assert_eq!(v.value(), 1.0);
    }
}
