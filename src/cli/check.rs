//! Offline canvas check command

use anyhow::Context;
use placeboard_canvas::{CanvasValidator, Error};
use std::path::Path;

use crate::server::load_config;

pub async fn run(image: &Path) -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    let validator = CanvasValidator::new(config.canvas.size());

    println!(
        "Checking {} against the {}x{} canvas... ",
        image.display(),
        validator.size().width,
        validator.size().height
    );

    let path = image.to_path_buf();
    let result = tokio::task::spawn_blocking(move || validator.validate_file(path))
        .await
        .context("Validation task panicked")?;

    match result {
        Ok(validated) => {
            println!("✅ Valid canvas ({} bytes)", validated.bytes().len());
            Ok(())
        }
        Err(Error::Storage(e)) => Err(anyhow::anyhow!(e)).context("Failed to read image"),
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
