mod config;
mod scene;

use std::env::var;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use charlcd_gpio::GpioDriver;
use charlcd_gpio::lcd::controller::LcdController;
use charlcd_gpio::raw::RawGpioDriver;
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use crate::config::Config;
use crate::scene::play_cycles;

fn open_gpio() -> eyre::Result<Arc<dyn GpioDriver>> {
    let gpio = match var("CHARLCD_GPIO_DEV").as_deref() {
        Ok("mem") => RawGpioDriver::new_mem()?,
        Ok("gpiomem") | Err(_) => RawGpioDriver::new_gpiomem()?,
        Ok(other) => eyre::bail!("Unknown GPIO device {:?}, expected gpiomem or mem", other),
    };
    Ok(Arc::new(gpio))
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    let pins = config::pins_from_env()?;
    info!("LCD @ RS: {}, E: {}, Data: {:?}", pins.rs, pins.e, pins.data);
    info!("Backlight @ {}, button @ {}", pins.backlight, pins.button);

    debug!("Trying to load config...");
    let config = config::load_or_create(&Config::path())?;
    config.validate()?;

    // Ctrl+C and SIGTERM only ask the loop to stop, so the display is still released below.
    let running = Arc::new(AtomicBool::new(true));
    ctrlc::set_handler({
        let running = Arc::clone(&running);
        move || {
            info!("Stopping...");
            running.store(false, Ordering::SeqCst);
        }
    })?;

    debug!("Initializing GPIO driver...");
    let gpio = open_gpio()?;
    debug!("{:?} initialized.", gpio);

    let mut lcd = LcdController::initialize(gpio, pins, true)?;

    info!("Playing {} scenes...", config.scenes.len());
    let played = play_cycles(
        &mut *lcd,
        &config.scenes,
        config.cycles,
        Duration::from_millis(config.pause_millis),
        &running,
    );

    // Release the display even if a scene failed.
    lcd.shutdown()?;
    info!("Bye after {} cycles!", played?);
    Ok(())
}
