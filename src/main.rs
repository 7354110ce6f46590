#[macro_use]
extern crate log;
extern crate simplelog;

use anyhow::Result;
use ftl_victim_select::{select_victim, Candidate, Ftl, SelectionParams};
use rand::prelude::*;
use simplelog::*;
use time::macros::format_description;

const OP: f64 = 7.0;
const RANDOM_PASSES: usize = 4;

fn reference_blocks() -> Vec<Candidate> {
    vec![
        Candidate::with_id(1, 10, 1000),
        Candidate::with_id(2, 5, 2000),
        Candidate::with_id(3, 15, 500),
        Candidate::with_id(4, 8, 1500),
    ]
}

fn select_reference_victim(params: &SelectionParams) -> Option<Candidate> {
    let blocks = reference_blocks();
    select_victim(&blocks, params).copied()
}

fn report(fw: &Ftl, label: &str) {
    let erase_counts = fw.erase_counts();
    let min = erase_counts.iter().min().copied().unwrap_or(0);
    let max = erase_counts.iter().max().copied().unwrap_or(0);

    info!(
        "{}: free {} full {} erase min/avg/max {}/{:.2}/{} WAF {:.3}",
        label,
        fw.free_block_count(),
        fw.full_block_count(),
        min,
        fw.average_erase_count(),
        max,
        fw.stats().write_amplification()
    );
}

fn main() -> Result<()> {
    let log_cfg = ConfigBuilder::new()
        .set_time_format_custom(format_description!("[hour]:[minute]:[second].[subsecond]"))
        .build();

    SimpleLogger::init(LevelFilter::Debug, log_cfg)?;

    let params = SelectionParams::default();
    match select_reference_victim(&params) {
        Some(victim) => info!(
            "Selected victim block: id {:?}, valid pages {}, P/E cycles {}",
            victim.id, victim.valid_page_count, victim.erase_count
        ),
        None => warn!("No suitable victim block found"),
    }

    let mut fw = Ftl::new_with_op(OP)?;
    let max_lba = fw.get_max_lba();

    fw.write_range(0, max_lba + 1)?;
    info!("Drive preconditioned");

    let mut rng: SmallRng = SmallRng::seed_from_u64(7);

    for c in 0..RANDOM_PASSES {
        for _ in 0..=max_lba {
            let lba = rng.gen_range(0..=max_lba);
            fw.write(lba)?;
        }
        report(&fw, &format!("Capacity {} randomly written", c));
    }

    Ok(())
}
