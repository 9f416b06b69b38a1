//! `off` subcommand — turn every pixel off and exit.

use std::path::Path;

use moonglow_lib::color::BLACK;
use moonglow_lib::strip::{PixelStrip, open_strip};

use super::Result;

pub(super) fn cmd_off(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path);
    let mut strip = open_strip(
        &config.strip.device,
        config.strip.length,
        config.strip.brightness,
    )?;
    strip.set_all(BLACK)?;
    strip.show()?;
    println!("Strip off ({} pixels).", config.strip.length);
    Ok(())
}
