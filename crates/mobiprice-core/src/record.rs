use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PriceError, PriceResult};

/// Number of input features per phone.
pub const N_FEATURES: usize = 20;

/// Number of price classes (`price_range` 0..=3).
pub const N_CLASSES: usize = 4;

/// Canonical feature order. Training, normalization and prediction all index
/// features through this table.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "battery_power",
    "blue",
    "clock_speed",
    "dual_sim",
    "fc",
    "four_g",
    "int_memory",
    "m_deep",
    "mobile_wt",
    "n_cores",
    "pc",
    "px_height",
    "px_width",
    "ram",
    "sc_h",
    "sc_w",
    "talk_time",
    "three_g",
    "touch_screen",
    "wifi",
];

/// Positions of the 0/1 features inside [`FEATURE_NAMES`].
const BINARY_FEATURES: [usize; 6] = [1, 3, 5, 17, 18, 19];

/// A phone's raw features in [`FEATURE_NAMES`] order.
pub type FeatureVector = [f64; N_FEATURES];

/// The 4-class price target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceRange {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl PriceRange {
    pub const ALL: [PriceRange; N_CLASSES] = [
        PriceRange::Low,
        PriceRange::Medium,
        PriceRange::High,
        PriceRange::VeryHigh,
    ];

    pub fn from_index(index: usize) -> PriceResult<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            PriceError::InvalidInput(format!("price range {index} outside 0..{N_CLASSES}"))
        })
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceRange::Low => "Low Cost",
            PriceRange::Medium => "Medium Cost",
            PriceRange::High => "High Cost",
            PriceRange::VeryHigh => "Very High Cost",
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One labelled phone. Field order matches [`FEATURE_NAMES`] and the CSV layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhoneRecord {
    pub battery_power: f64,
    pub blue: f64,
    pub clock_speed: f64,
    pub dual_sim: f64,
    pub fc: f64,
    pub four_g: f64,
    pub int_memory: f64,
    pub m_deep: f64,
    pub mobile_wt: f64,
    pub n_cores: f64,
    pub pc: f64,
    pub px_height: f64,
    pub px_width: f64,
    pub ram: f64,
    pub sc_h: f64,
    pub sc_w: f64,
    pub talk_time: f64,
    pub three_g: f64,
    pub touch_screen: f64,
    pub wifi: f64,
    pub price_range: u8,
}

impl PhoneRecord {
    /// Build a record from a feature slice in canonical order.
    pub fn from_features(features: &[f64], price_range: u8) -> PriceResult<Self> {
        if features.len() != N_FEATURES {
            return Err(PriceError::DimensionMismatch {
                expected: N_FEATURES,
                got: features.len(),
            });
        }
        let f = features;
        Ok(PhoneRecord {
            battery_power: f[0],
            blue: f[1],
            clock_speed: f[2],
            dual_sim: f[3],
            fc: f[4],
            four_g: f[5],
            int_memory: f[6],
            m_deep: f[7],
            mobile_wt: f[8],
            n_cores: f[9],
            pc: f[10],
            px_height: f[11],
            px_width: f[12],
            ram: f[13],
            sc_h: f[14],
            sc_w: f[15],
            talk_time: f[16],
            three_g: f[17],
            touch_screen: f[18],
            wifi: f[19],
            price_range,
        })
    }

    pub fn features(&self) -> FeatureVector {
        [
            self.battery_power,
            self.blue,
            self.clock_speed,
            self.dual_sim,
            self.fc,
            self.four_g,
            self.int_memory,
            self.m_deep,
            self.mobile_wt,
            self.n_cores,
            self.pc,
            self.px_height,
            self.px_width,
            self.ram,
            self.sc_h,
            self.sc_w,
            self.talk_time,
            self.three_g,
            self.touch_screen,
            self.wifi,
        ]
    }

    pub fn label(&self) -> usize {
        self.price_range as usize
    }

    pub fn price(&self) -> PriceResult<PriceRange> {
        PriceRange::from_index(self.label())
    }

    /// Reject non-finite values and non-0/1 flags. `price_range` is not checked.
    pub fn validate_features(&self) -> PriceResult<()> {
        validate_features(&self.features())
    }

    /// Reject non-finite values, non-0/1 flags and out-of-range labels.
    pub fn validate(&self) -> PriceResult<()> {
        self.validate_features()?;
        self.price()?;
        Ok(())
    }
}

/// Check a raw feature vector in [`FEATURE_NAMES`] order.
pub fn validate_features(features: &[f64]) -> PriceResult<()> {
    if features.len() != N_FEATURES {
        return Err(PriceError::DimensionMismatch {
            expected: N_FEATURES,
            got: features.len(),
        });
    }
    for (name, v) in FEATURE_NAMES.iter().zip(features) {
        if !v.is_finite() {
            return Err(PriceError::InvalidInput(format!("{name} is not a finite number")));
        }
    }
    for &idx in &BINARY_FEATURES {
        let v = features[idx];
        if v != 0.0 && v != 1.0 {
            return Err(PriceError::InvalidInput(format!(
                "{} must be 0 or 1, got {v}",
                FEATURE_NAMES[idx]
            )));
        }
    }
    Ok(())
}

/// Index of a feature by name.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|&n| n == name)
}
