use anyhow::Context;
use harmloccore::prelude::{DatasetLayout, Phasor};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Synthetic transmitted-waveform response over the sub-band of every step.
pub fn synthetic_reference(layout: &DatasetLayout, seed: u64) -> Vec<Phasor> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..layout.base_len())
        .map(|_| Phasor::from_polar(rng.gen_range(0.5..1.5), rng.gen_range(-PI..PI)))
        .collect()
}

/// Writes one `real imag` pair per line, the format the localizer reads at startup.
pub fn write_calibration<P: AsRef<Path>>(path: P, reference: &[Phasor]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for phasor in reference {
        writeln!(writer, "{} {}", phasor.re, phasor.im)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
