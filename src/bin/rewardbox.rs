use anyhow::Result;

fn main() -> Result<()> {
    rewardbox::cli::run()
}
