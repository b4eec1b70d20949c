#[macro_use]
extern crate log;
extern crate simplelog;

use byte_unit::Byte;
use rand::prelude::*;
use simplelog::*;
use time::macros::format_description;
use wear_ftl::config::*;
use wear_ftl::{Ftl, RamFlash};

fn stamp(lba: Lba, version: u64) -> PageBuf {
    let mut buf = [ERASED_BYTE; PAGE_SIZE];
    buf[..8].copy_from_slice(&(lba as u64).to_le_bytes());
    buf[8..16].copy_from_slice(&version.to_le_bytes());
    buf
}

fn main() {
    let log_cfg = ConfigBuilder::new()
        .set_time_format_custom(format_description!("[hour]:[minute]:[second].[subsecond]"))
        .build();

    if let Err(e) = SimpleLogger::init(LevelFilter::Info, log_cfg) {
        eprintln!("logger: {e}");
    }

    if let Err(e) = run() {
        error!("simulation failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Simulated drive: {}",
        Byte::from_bytes(CAPACITY as u128).get_appropriate_unit(true)
    );

    let mut flash = RamFlash::new(FLASH_BLOCKS, PAGES_PER_BLOCK);
    let mut fw = Ftl::new_with_op(&mut flash, OVER_PROVISIONING)?;
    let max_lba = fw.get_max_lba();
    let mut shadow = vec![0u64; max_lba + 1];
    let mut version = 0u64;

    for lba in 0..=max_lba {
        version += 1;
        fw.write(lba, &stamp(lba, version))?;
        shadow[lba] = version;
    }
    info!("Drive preconditioned");

    let mut rng: SmallRng = SmallRng::seed_from_u64(7);

    for c in 0..4 {
        for _ in 0..=max_lba {
            let lba = rng.gen_range(0..=max_lba);
            version += 1;
            fw.write(lba, &stamp(lba, version))?;
            shadow[lba] = version;
        }
        info!(
            "Capacity {} randomly written, erase spread {}",
            c,
            fw.wear_spread()
        );
    }

    let mut out = [ERASED_BYTE; PAGE_SIZE];
    for (lba, &expected) in shadow.iter().enumerate() {
        fw.read(lba, &mut out)?;
        if out != stamp(lba, expected) {
            return Err(format!("logical block {lba} lost its last write").into());
        }
    }
    fw.tables().check_invariants()?;
    info!("All {} logical blocks verified", max_lba + 1);

    let erases = fw.erase_counts();
    let stats = fw.report();
    info!(
        "cleans: {}, wear leveling cleans: {}, migrated pages: {}",
        stats.cleans, stats.wear_level_cleans, stats.migrated_pages
    );
    info!(
        "erase counts: min {}, max {}",
        erases.iter().min().copied().unwrap_or(0),
        erases.iter().max().copied().unwrap_or(0)
    );

    let flash_stats = flash.stats();
    info!(
        "flash reads: {}, writes: {}, erases: {}, write amplification: {:.2}",
        flash_stats.reads,
        flash_stats.writes,
        flash_stats.erases,
        flash_stats.writes as f64 / stats.writes as f64
    );
    Ok(())
}
