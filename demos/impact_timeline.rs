use impact_effects::geo::{latlon_to_unit, LatLon};
use impact_effects::io::{load_scenario_from_json, ImpactEvent, Scenario};
use impact_effects::layers::pressure::{band_label, severity_band};
use impact_effects::layers::{EffectLayer, EffectsConfig, ImpactEffects, LayerKind};
use impact_effects::physics::blast::pascals_to_psi;
use impact_effects::physics::crater::{tnt_megatons, CraterDimensions};

fn main() -> anyhow::Result<()> {
    let scenario = match std::env::args().nth(1) {
        Some(path) => load_scenario_from_json(path)?,
        None => Scenario {
            name: "Demo".to_string(),
            event: ImpactEvent::from_impactor(
                latlon_to_unit(LatLon { latitude: 20.0, longitude: -30.0 }),
                1.0,
                20.0,
                3000.0,
            )?,
            quality: Default::default(),
            effects: EffectsConfig::default(),
        },
    };
    let event = &scenario.event;
    let effects = ImpactEffects::new(&scenario.effects)?;
    effects.pressure_wave.validate_for(event)?;

    let crater = CraterDimensions::estimate(event);
    println!("Scenario: {}", scenario.name);
    println!(
        "Energy: {:.3e} J ({:.1} Mt), crater {:.1} km wide, {:.2} km deep",
        event.energy_joules(),
        tnt_megatons(event.energy_joules()),
        crater.final_diameter_km,
        crater.depth_km
    );

    println!("{:>6} {:<48} {:>8} {:>10} {:>10}", "t", "layers", "front", "peak psi", "entry heat");
    for step in 0..=40 {
        let progress = step as f32 / 40.0;
        let visibility = effects.visibility(progress, event);
        let active: Vec<&str> = LayerKind::ALL
            .iter()
            .filter(|k| visibility.get(**k))
            .map(|k| k.label())
            .collect();

        let front = effects
            .shockwave
            .angular_radius(progress, event)
            .map(|r| format!("{:.1} deg", r.to_degrees()))
            .unwrap_or_else(|| "-".to_string());

        let peak = effects
            .pressure_wave
            .frame(progress, event)
            .map(|f| {
                let psi = pascals_to_psi(f.peak_overpressure_pa) as f32;
                let band = severity_band(psi, event.pressure_psi_thresholds());
                format!("{:.0} ({})", psi, band_label(band, event.pressure_psi_thresholds()))
            })
            .unwrap_or_else(|| "-".to_string());

        let heat = effects
            .heat_haze
            .frame(progress, event)
            .map(|f| format!("{:.0} K", f.state.temperature_k))
            .unwrap_or_else(|| "-".to_string());

        println!("{:>6.3} {:<48} {:>8} {:>10} {:>10}", progress, active.join(", "), front, peak, heat);
    }
    Ok(())
}
