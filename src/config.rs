/// All tunable parameters — exposed as sliders in the viewer frontend.
#[derive(Clone, Debug)]
pub struct Params {
    // Logistic IC -> SDR transform (Vigiak et al. calibration defaults)
    pub sdr_max: f32,
    pub ic0: f32,
    pub k: f32,

    // Synthetic terrain for the demo harness
    pub relief: f32,
    pub detail_amp: f32,
    pub tilt: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            sdr_max: 0.8,
            ic0: 0.5,
            k: 1.0,
            relief: 600.0,
            detail_amp: 0.35,
            tilt: 0.5,
        }
    }
}
