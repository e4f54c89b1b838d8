use mobiprice_core::{PhoneRecord, N_CLASSES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform `[lo, hi)` ranges of the continuous features for one price class.
#[derive(Debug, Clone, Copy)]
pub struct PriceProfile {
    pub battery_power: (f64, f64),
    pub ram: (f64, f64),
    pub int_memory: (f64, f64),
    pub pc: (f64, f64),
    pub fc: (f64, f64),
    pub clock_speed: (f64, f64),
    pub mobile_wt: (f64, f64),
    pub px_height: (f64, f64),
    pub px_width: (f64, f64),
    pub sc_h: (f64, f64),
    pub sc_w: (f64, f64),
    pub talk_time: (f64, f64),
    pub n_cores: (f64, f64),
}

/// Profiles for Low, Medium, High and Very High cost phones. Neighbouring
/// classes overlap, so the classes are separable but not trivially.
pub const PRICE_PROFILES: [PriceProfile; N_CLASSES] = [
    PriceProfile {
        battery_power: (1500.0, 3000.0),
        ram: (1024.0, 3072.0),
        int_memory: (8.0, 32.0),
        pc: (5.0, 12.0),
        fc: (2.0, 8.0),
        clock_speed: (1.0, 2.2),
        mobile_wt: (140.0, 200.0),
        px_height: (800.0, 1600.0),
        px_width: (480.0, 900.0),
        sc_h: (10.0, 14.0),
        sc_w: (5.0, 7.0),
        talk_time: (8.0, 15.0),
        n_cores: (1.0, 4.0),
    },
    PriceProfile {
        battery_power: (2500.0, 4000.0),
        ram: (2048.0, 4096.0),
        int_memory: (16.0, 64.0),
        pc: (8.0, 16.0),
        fc: (5.0, 12.0),
        clock_speed: (1.8, 2.8),
        mobile_wt: (130.0, 180.0),
        px_height: (1200.0, 2000.0),
        px_width: (720.0, 1200.0),
        sc_h: (12.0, 16.0),
        sc_w: (6.0, 8.0),
        talk_time: (12.0, 20.0),
        n_cores: (2.0, 6.0),
    },
    PriceProfile {
        battery_power: (3000.0, 5000.0),
        ram: (3072.0, 8192.0),
        int_memory: (32.0, 128.0),
        pc: (12.0, 24.0),
        fc: (8.0, 16.0),
        clock_speed: (2.2, 3.2),
        mobile_wt: (120.0, 160.0),
        px_height: (1600.0, 2400.0),
        px_width: (900.0, 1440.0),
        sc_h: (14.0, 18.0),
        sc_w: (7.0, 9.0),
        talk_time: (15.0, 25.0),
        n_cores: (4.0, 8.0),
    },
    PriceProfile {
        battery_power: (4000.0, 6000.0),
        ram: (6144.0, 16384.0),
        int_memory: (64.0, 512.0),
        pc: (20.0, 108.0),
        fc: (12.0, 40.0),
        clock_speed: (2.8, 4.0),
        mobile_wt: (100.0, 150.0),
        px_height: (2000.0, 3200.0),
        px_width: (1200.0, 1600.0),
        sc_h: (16.0, 20.0),
        sc_w: (8.0, 10.0),
        talk_time: (20.0, 30.0),
        n_cores: (6.0, 8.0),
    },
];

fn uniform<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    lo + rng.gen::<f64>() * (hi - lo)
}

fn whole<R: Rng>(rng: &mut R, range: (f64, f64)) -> f64 {
    uniform(rng, range).floor()
}

fn one_decimal<R: Rng>(rng: &mut R, range: (f64, f64)) -> f64 {
    (uniform(rng, range) * 10.0).round() / 10.0
}

fn flag<R: Rng>(rng: &mut R, p: f64) -> f64 {
    if rng.gen::<f64>() < p {
        1.0
    } else {
        0.0
    }
}

/// Draw one phone of the given price class.
pub fn sample_phone<R: Rng>(rng: &mut R, price_range: u8) -> PhoneRecord {
    let class = (price_range as usize).min(N_CLASSES - 1);
    let p = &PRICE_PROFILES[class];
    let level = class as f64;

    PhoneRecord {
        battery_power: whole(rng, p.battery_power),
        ram: whole(rng, p.ram),
        int_memory: whole(rng, p.int_memory),
        pc: whole(rng, p.pc),
        fc: whole(rng, p.fc),
        clock_speed: one_decimal(rng, p.clock_speed),
        mobile_wt: whole(rng, p.mobile_wt),
        px_height: whole(rng, p.px_height),
        px_width: whole(rng, p.px_width),
        sc_h: one_decimal(rng, p.sc_h),
        sc_w: one_decimal(rng, p.sc_w),
        talk_time: whole(rng, p.talk_time),
        n_cores: whole(rng, p.n_cores),
        // Pricier phones are more likely to carry each feature.
        blue: flag(rng, 0.5 + level * 0.1),
        dual_sim: flag(rng, 0.4 + level * 0.1),
        four_g: flag(rng, 0.3 + level * 0.2),
        three_g: flag(rng, 0.7 + level * 0.1),
        touch_screen: flag(rng, 0.8 + level * 0.05),
        wifi: flag(rng, 0.6 + level * 0.1),
        m_deep: one_decimal(rng, (0.5, 1.0)),
        price_range: class as u8,
    }
}

/// Generate `count` phones with uniformly drawn price classes.
pub fn make_phones(count: usize, seed: Option<u64>) -> Vec<PhoneRecord> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    (0..count)
        .map(|_| {
            let price_range = rng.gen_range(0..N_CLASSES as u8);
            sample_phone(&mut rng, price_range)
        })
        .collect()
}
