//! Raw and calibrated paddle hit types.
//!
//! A [`RawPaddleHit`] is what the upstream decoder delivers for one bar in
//! one event. The hit extractor turns it into at most one
//! [`CalibratedPaddleHit`].

use serde::{Deserialize, Serialize};

use crate::constants::BIG;

/// PMT end of a paddle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Positive,
    Negative,
}

impl Side {
    /// Both sides, positive first.
    pub const BOTH: [Side; 2] = [Side::Positive, Side::Negative];
}

/// One entry of a multi-hit TDC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdcHit {
    /// Raw TDC counts.
    pub time_raw: i32,
    /// Reference-time corrected TDC counts.
    pub time: i32,
}

impl TdcHit {
    #[must_use]
    pub fn new(time_raw: i32, time: i32) -> Self {
        Self { time_raw, time }
    }
}

/// One pulse found by the flash ADC firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcPulse {
    pub ped_raw: i32,
    pub ped: f64,
    pub int_raw: i32,
    pub int: f64,
    pub amp_raw: i32,
    pub amp: f64,
    pub time_raw: i32,
    /// Pulse time in ns.
    pub time: f64,
}

/// All ADC information for one PMT in one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcChannel {
    pub pulses: Vec<AdcPulse>,
    /// Raw sample integral over the readout window.
    pub sample_int_raw: f64,
    /// Sample integral with the firmware pedestal already removed.
    pub sample_int: f64,
}

impl AdcChannel {
    /// Raw integral of the first pulse, if any.
    #[must_use]
    pub fn first_pulse_int_raw(&self) -> Option<i32> {
        self.pulses.first().map(|p| p.int_raw)
    }
}

/// One scintillator bar as read out this event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPaddleHit {
    /// 1-based plane number.
    pub plane: u32,
    /// 1-based paddle number.
    pub paddle: u32,
    pub pos_tdc: Vec<TdcHit>,
    pub neg_tdc: Vec<TdcHit>,
    pub pos_adc: AdcChannel,
    pub neg_adc: AdcChannel,
}

impl RawPaddleHit {
    #[must_use]
    pub fn new(plane: u32, paddle: u32) -> Self {
        Self {
            plane,
            paddle,
            ..Self::default()
        }
    }

    /// Append a TDC entry on one side.
    #[must_use]
    pub fn with_tdc(mut self, side: Side, hit: TdcHit) -> Self {
        match side {
            Side::Positive => self.pos_tdc.push(hit),
            Side::Negative => self.neg_tdc.push(hit),
        }
        self
    }

    /// Append an ADC pulse on one side.
    #[must_use]
    pub fn with_pulse(mut self, side: Side, pulse: AdcPulse) -> Self {
        match side {
            Side::Positive => self.pos_adc.pulses.push(pulse),
            Side::Negative => self.neg_adc.pulses.push(pulse),
        }
        self
    }

    #[must_use]
    pub fn tdc(&self, side: Side) -> &[TdcHit] {
        match side {
            Side::Positive => &self.pos_tdc,
            Side::Negative => &self.neg_tdc,
        }
    }

    #[must_use]
    pub fn adc(&self, side: Side) -> &AdcChannel {
        match side {
            Side::Positive => &self.pos_adc,
            Side::Negative => &self.neg_adc,
        }
    }

    /// 0-based paddle index, `None` for paddle number 0.
    #[must_use]
    pub fn paddle_index(&self) -> Option<usize> {
        (self.paddle as usize).checked_sub(1)
    }
}

/// ADC values selected for one side of a calibrated hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdcSignal {
    pub pedestal: f64,
    /// Pedestal-subtracted integral.
    pub integral: f64,
    /// Pulse amplitude; `None` in the sample-integral modes.
    pub amplitude: Option<f64>,
    /// Pulse time including the plane ADC/TDC offset.
    pub time: Option<f64>,
    /// TDC time minus ADC pulse time.
    pub tdc_diff_time: Option<f64>,
    /// Number of pulses on the channel.
    pub multiplicity: usize,
    /// 1-based index of the matched pulse.
    pub pulse_used: Option<usize>,
}

impl AdcSignal {
    /// Aggregate signal without a specific pulse (sample-integral modes).
    #[must_use]
    pub fn aggregate(pedestal: f64, integral: f64, multiplicity: usize) -> Self {
        Self {
            pedestal,
            integral,
            amplitude: None,
            time: None,
            tdc_diff_time: None,
            multiplicity,
            pulse_used: None,
        }
    }
}

/// One PMT side of a calibrated hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideSignal {
    /// First in-window TDC value (counts, plane offset applied).
    pub tdc: Option<i32>,
    /// Matched ADC signal.
    pub adc: Option<AdcSignal>,
    /// TDC time in ns, [`BIG`] without a valid TDC.
    pub uncorrected_time: f64,
    /// TDC time minus the time-walk term, [`BIG`] without a valid TDC.
    pub walk_corrected_time: f64,
    /// Pulse-height and position corrected time, [`BIG`] if the side is not good.
    pub corrected_time: f64,
    /// `corrected_time` with the nominal flight time to the plane removed.
    pub tof_corrected_time: f64,
}

impl Default for SideSignal {
    fn default() -> Self {
        Self {
            tdc: None,
            adc: None,
            uncorrected_time: BIG,
            walk_corrected_time: BIG,
            corrected_time: BIG,
            tof_corrected_time: BIG,
        }
    }
}

impl SideSignal {
    #[must_use]
    pub fn has_tdc(&self) -> bool {
        self.tdc.is_some()
    }

    #[must_use]
    pub fn has_adc(&self) -> bool {
        self.adc.is_some()
    }

    /// Valid TDC and matched ADC.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.has_tdc() && self.has_adc()
    }

    /// Pulse amplitude, 0 when unknown.
    #[must_use]
    pub fn amplitude(&self) -> f64 {
        self.adc.and_then(|a| a.amplitude).unwrap_or(0.0)
    }
}

/// A paddle with at least one good side in this event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibratedPaddleHit {
    /// 1-based paddle number.
    pub paddle: u32,
    pub pos: SideSignal,
    pub neg: SideSignal,
    /// Mean of both corrected times, 0 when only one side is good.
    pub scin_corrected_time: f64,
    /// Both TOF-corrected times agree with the event consensus time.
    pub two_good_times: bool,
    /// Nominal paddle centre (no plane offset).
    pub paddle_center: f64,
    /// Position along the bar from the time difference, clamped to the bar.
    pub hit_position: Option<f64>,
    /// Position along the bar from the time-walk corrected difference.
    pub diff_dist_track: Option<f64>,
}

impl CalibratedPaddleHit {
    #[must_use]
    pub fn new(paddle: u32, paddle_center: f64) -> Self {
        Self {
            paddle,
            pos: SideSignal::default(),
            neg: SideSignal::default(),
            scin_corrected_time: 0.0,
            two_good_times: false,
            paddle_center,
            hit_position: None,
            diff_dist_track: None,
        }
    }

    /// 0-based paddle index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.paddle.saturating_sub(1) as usize
    }

    #[must_use]
    pub fn side(&self, side: Side) -> &SideSignal {
        match side {
            Side::Positive => &self.pos,
            Side::Negative => &self.neg,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideSignal {
        match side {
            Side::Positive => &mut self.pos,
            Side::Negative => &mut self.neg,
        }
    }

    #[must_use]
    pub fn has_pos_tdc(&self) -> bool {
        self.pos.has_tdc()
    }

    #[must_use]
    pub fn has_neg_tdc(&self) -> bool {
        self.neg.has_tdc()
    }

    #[must_use]
    pub fn has_pos_adc(&self) -> bool {
        self.pos.has_adc()
    }

    #[must_use]
    pub fn has_neg_adc(&self) -> bool {
        self.neg.has_adc()
    }

    /// Both ends have a valid TDC and a matched ADC.
    #[must_use]
    pub fn both_sides_good(&self) -> bool {
        self.pos.is_good() && self.neg.is_good()
    }
}
