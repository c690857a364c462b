use anyhow::{Context, Result};

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Answer on a 0-10 scale, rounded to one decimal like a slider would.
fn endpoint(rng: &mut SimpleRng, mean: f64, std_dev: f64) -> f64 {
    (rng.gauss(mean, std_dev).clamp(0.0, 10.0) * 10.0).round() / 10.0
}

/// One respondent's answer for a word centred on `(left, right)`.
///
/// About 5% answer "no idea" with the full scale and about 5% give an
/// answer somewhere else on the scale entirely.
fn answer(rng: &mut SimpleRng, left: f64, right: f64) -> (f64, f64) {
    let roll = rng.next_f64();
    if roll < 0.05 {
        return (0.0, 10.0);
    }
    if roll < 0.10 {
        let a = endpoint(rng, 5.0, 3.0);
        let b = endpoint(rng, 5.0, 3.0);
        return (a.min(b), a.max(b));
    }
    let l = endpoint(rng, left, 0.6);
    let r = endpoint(rng, right, 0.6);
    (l.min(r), l.max(r))
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_survey.csv".to_string());
    let respondents = 40;
    let mut rng = SimpleRng::new(42);

    let words: [(&str, f64, f64); 6] = [
        ("None to very little", 0.2, 1.8),
        ("A smidgen", 0.8, 2.5),
        ("Some", 3.0, 5.5),
        ("A moderate amount", 4.0, 6.0),
        ("A considerable amount", 6.5, 8.5),
        ("A maximum amount", 8.6, 9.9),
    ];

    let mut wtr = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;

    let header: Vec<&str> = words.iter().flat_map(|(label, _, _)| [*label, ""]).collect();
    wtr.write_record(&header)?;

    for _ in 0..respondents {
        let mut row = Vec::with_capacity(words.len() * 2);
        for &(_, left, right) in &words {
            let (l, r) = answer(&mut rng, left, right);
            row.push(l.to_string());
            row.push(r.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    println!(
        "Wrote {respondents} respondents x {} words to {output_path}",
        words.len()
    );
    Ok(())
}
