//! Commands sent from the control side to the engine worker over the
//! bounded ring buffer — the only outbound interface from the core.

use crate::preset::{Params, Value};

/// The audio engine command protocol.
#[derive(Debug)]
pub enum EngineCommand {
    /// Instantiate the named preset with the given params, fade in,
    /// attach to the master bus.
    PlayPreset { preset: String, params: Params },

    /// Begin fade-out; destroy the instance when the envelope completes.
    StopPreset { preset: String, fade_ms: f64 },

    /// Slew a parameter on a live instance.
    SetParam {
        preset: String,
        key: String,
        value: Value,
    },

    /// Parametric EQ gain from the spectral mixer.
    SetEqGain { band_hz: f64, gain: f64 },

    /// Fade out every live instance.
    StopAll { fade_ms: f64 },

    /// Terminate the engine worker.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::{
        traits::{Consumer, Producer, Split},
        HeapRb,
    };

    #[test]
    fn commands_transit_ring_buffer_in_order() {
        let rb = HeapRb::<EngineCommand>::new(8);
        let (mut prod, mut cons) = rb.split();

        prod.try_push(EngineCommand::PlayPreset {
            preset: "dual_drone".into(),
            params: Params::new(),
        })
        .unwrap();
        prod.try_push(EngineCommand::SetParam {
            preset: "dual_drone".into(),
            key: "base_freq".into(),
            value: Value::Float(110.0),
        })
        .unwrap();
        prod.try_push(EngineCommand::StopPreset {
            preset: "dual_drone".into(),
            fade_ms: 500.0,
        })
        .unwrap();

        assert!(matches!(
            cons.try_pop().unwrap(),
            EngineCommand::PlayPreset { .. }
        ));
        assert!(matches!(
            cons.try_pop().unwrap(),
            EngineCommand::SetParam { .. }
        ));
        assert!(matches!(
            cons.try_pop().unwrap(),
            EngineCommand::StopPreset { .. }
        ));
        assert!(cons.try_pop().is_none());
    }

    #[test]
    fn bounded_queue_rejects_overflow() {
        let rb = HeapRb::<EngineCommand>::new(2);
        let (mut prod, _cons) = rb.split();
        assert!(prod.try_push(EngineCommand::Shutdown).is_ok());
        assert!(prod.try_push(EngineCommand::Shutdown).is_ok());
        assert!(prod.try_push(EngineCommand::Shutdown).is_err());
    }
}
