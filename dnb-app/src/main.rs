mod app;
mod audio;

use app::App;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "dnb-data";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = std::env::var_os("DNB_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let app = App::new(data_dir)?;
    app.run()?;

    Ok(())
}
