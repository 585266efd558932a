use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};

const TYPES: &[(&str, f64)] = &[
    ("Choque", 0.45),
    ("Colisión", 0.20),
    ("Atropello", 0.12),
    ("Volcamiento", 0.08),
    ("Roce", 0.10),
    ("Caída", 0.05),
];

const LOCATIONS: &[&str] = &[
    "Centro",
    "Norte",
    "Sur",
    "Oriente",
    "Poniente",
    "Costanera",
    "Ruta 5",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Pick from weighted choices.
    fn weighted<'a>(&mut self, choices: &[(&'a str, f64)]) -> &'a str {
        let total: f64 = choices.iter().map(|(_, w)| w).sum();
        let mut r = self.next_f64() * total;
        for (name, w) in choices {
            if r < *w {
                return *name;
            }
            r -= w;
        }
        choices.last().map_or("", |(name, _)| *name)
    }
}

fn main() -> Result<()> {
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_accidents.csv"));

    let mut rng = SimpleRng::new(42);
    let first_day = NaiveDate::from_ymd_opt(2021, 1, 1).context("invalid start date")?;

    let mut writer = csv::Writer::from_path(&out)
        .with_context(|| format!("creating {}", out.display()))?;
    writer.write_record([
        "fecha",
        "año",
        "tipo_accidente",
        "ubicacion",
        "heridos",
        "vehiculos",
        "velocidad_kmh",
    ])?;

    let n_rows = 1500;
    for _ in 0..n_rows {
        let fecha = first_day + Duration::days(rng.below(3 * 365) as i64);
        let tipo = rng.weighted(TYPES);
        let ubicacion = LOCATIONS[rng.below(LOCATIONS.len())];
        let heridos = rng.gauss(1.0, 1.2).round().max(0.0) as u32;
        let vehiculos = 1 + rng.below(3);
        let velocidad = rng.gauss(55.0, 18.0).max(5.0);

        // A few rows with missing speed, as in real reports.
        let velocidad = if rng.next_f64() < 0.03 {
            String::new()
        } else {
            format!("{velocidad:.1}")
        };

        writer.write_record([
            fecha.format("%Y-%m-%d").to_string(),
            fecha.year().to_string(),
            tipo.to_string(),
            ubicacion.to_string(),
            heridos.to_string(),
            vehiculos.to_string(),
            velocidad,
        ])?;
    }
    writer.flush().context("flushing CSV")?;

    println!("Wrote {n_rows} accident records to {}", out.display());
    Ok(())
}
