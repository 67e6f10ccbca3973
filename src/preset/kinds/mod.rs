//! Builtin preset kinds — one module per synthesis recipe.

pub mod clip_lead;
pub mod dual_drone;
pub mod fm_pad;
pub mod impulse_tap;
pub mod keys;
pub mod noise_beds;
pub mod noise_hit;
pub mod sampler;
pub mod swarm;

use super::registry::KindSpec;

/// The full builtin table, enumerated by the registry.
pub fn all() -> Vec<KindSpec> {
    vec![
        dual_drone::spec(),
        swarm::spec(),
        noise_beds::air_bed_spec(),
        noise_beds::rain_bed_spec(),
        noise_beds::crush_bed_spec(),
        fm_pad::spec(),
        impulse_tap::spec(),
        noise_hit::spec(),
        clip_lead::spec(),
        sampler::spec(),
        keys::spec(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::Params;

    #[test]
    fn all_kinds_construct_and_render() {
        for spec in all() {
            let mut preset = (spec.ctor)(44100.0, &(spec.defaults)());
            preset.play().expect("first play must succeed");
            let mut out = vec![0.0f32; 2048];
            preset.render(&mut out);
            assert!(
                out.iter().all(|s| s.is_finite()),
                "{} rendered non-finite samples",
                spec.name
            );
        }
    }

    #[test]
    fn all_kinds_reject_double_play() {
        for spec in all() {
            let mut preset = (spec.ctor)(44100.0, &(spec.defaults)());
            preset.play().unwrap();
            assert!(preset.play().is_err(), "{} allowed double play", spec.name);
        }
    }

    #[test]
    fn all_kinds_die_after_stop() {
        for spec in all() {
            let mut preset = (spec.ctor)(44100.0, &(spec.defaults)());
            preset.play().unwrap();
            let mut out = vec![0.0f32; 2048];
            preset.render(&mut out);
            preset.stop(40.0);
            // Render ~1 s, far beyond any fade.
            for _ in 0..43 {
                out.fill(0.0);
                preset.render(&mut out);
            }
            assert!(preset.is_dead(), "{} did not die after stop", spec.name);
        }
    }

    #[test]
    fn kind_names_are_unique() {
        let specs = all();
        for i in 0..specs.len() {
            for j in (i + 1)..specs.len() {
                assert_ne!(specs[i].name, specs[j].name);
            }
        }
    }

    #[test]
    fn defaults_build_without_params() {
        // Kinds must also construct from an empty map (all defaults).
        for spec in all() {
            let preset = (spec.ctor)(48000.0, &Params::new());
            assert_eq!(preset.kind(), spec.name);
        }
    }
}
